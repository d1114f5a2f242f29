use pretty_assertions::assert_eq;
use test_env_log::test;

use super::{format_float, ArrayMethod, StringMethod};
use crate::dispatch::Intrinsic;
use crate::error::RuntimeError;
use crate::runtime::Runtime;
use crate::value::Val;

fn runtime() -> Runtime {
    Runtime::with_builtins().expect("Failed to bootstrap runtime")
}

fn call(rt: &Runtime, slot: usize, args: &[Val]) -> Val {
    rt.call_method(slot, args).expect("method call should succeed")
}

fn repr(rt: &Runtime, v: &Val) -> String {
    rt.call_to_string(v)
        .expect("toString should succeed")
        .as_str_lossy()
        .into_owned()
}

fn string(rt: &Runtime, s: &'static str) -> Val {
    rt.make_string(s).into()
}

fn ints(rt: &Runtime, items: &[i64]) -> Val {
    rt.make_array(items.iter().map(|&i| rt.make_int(i))).into()
}

/// Call a `String` method on `receiver` and render the result.
fn on_string(rt: &Runtime, method: StringMethod, receiver: &'static str, rest: &[Val]) -> String {
    let mut args = vec![string(rt, receiver)];
    args.extend_from_slice(rest);
    repr(rt, &call(rt, method.slot(), &args))
}

#[test]
fn test_format_float() {
    assert_eq!(format_float(3.0), "3");
    assert_eq!(format_float(3.25), "3.25");
    assert_eq!(format_float(-0.500), "-0.5");
    assert_eq!(format_float(3.5000), "3.5");
    assert_eq!(format_float(100.0), "100");
    assert_eq!(format_float(0.1), "0.1");
    assert_eq!(format_float(1.0 / 3.0), "0.333333");
    assert_eq!(format_float(0.0), "0");
}

#[test]
fn test_format_float_keeps_negative_sign_of_zero() {
    assert_eq!(format_float(-0.0), "-0");
    assert_eq!(format_float(-1e-9), "-0");
    assert_eq!(format_float(1e-9), "0");
}

#[test]
fn test_format_float_non_finite() {
    assert_eq!(format_float(f64::NAN), "NaN");
    assert_eq!(format_float(f64::INFINITY), "inf");
    assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
}

#[test]
fn test_method_slots_follow_enums() {
    let rt = runtime();
    let types = rt.types();

    let string = rt.vtable().entry(types.string).expect("registered");
    for method in StringMethod::ALL {
        let registered = string.method(method.slot()).expect("slot is filled");
        assert_eq!(registered.name(), method.name());
    }
    assert_eq!(string.methods().len(), 3 + StringMethod::ALL.len());

    let array = rt.vtable().entry(types.array).expect("registered");
    for method in ArrayMethod::ALL {
        let registered = array.method(method.slot()).expect("slot is filled");
        assert_eq!(registered.name(), method.name());
    }
    assert_eq!(array.methods().len(), 3 + ArrayMethod::ALL.len());

    assert!(StringMethod::ALL
        .iter()
        .all(|m| m.slot() >= Intrinsic::ALL.len()));
}

#[test]
fn test_string_case_and_length() {
    let rt = runtime();
    assert_eq!(
        call(&rt, StringMethod::Length.slot(), &[string(&rt, "héllo")]).as_int(),
        Some(6),
        "length counts bytes"
    );
    assert_eq!(on_string(&rt, StringMethod::ToLower, "AbC", &[]), "abc");
    assert_eq!(on_string(&rt, StringMethod::ToUpper, "AbC", &[]), "ABC");
}

#[test]
fn test_string_pad_left() {
    let rt = runtime();
    let pad = |width: i64, padding: &'static str| {
        on_string(
            &rt,
            StringMethod::PadLeft,
            "7",
            &[rt.make_int(width), string(&rt, padding)],
        )
    };
    assert_eq!(pad(3, "0"), "007");
    assert_eq!(pad(4, "ab"), "ab7");
    assert_eq!(pad(1, "0"), "7");
    assert_eq!(pad(-2, "0"), "7");
    assert_eq!(pad(5, ""), "7");

    let err = rt
        .call_method(
            StringMethod::PadLeft.slot(),
            &[string(&rt, "7"), string(&rt, "3"), string(&rt, "0")],
        )
        .expect_err("width must be an Int");
    assert!(matches!(
        err,
        RuntimeError::Argument {
            index: 1,
            expected: "Int",
            ..
        }
    ));
}

#[test]
fn test_string_trim() {
    let rt = runtime();
    assert_eq!(on_string(&rt, StringMethod::Trim, "  a b \n", &[]), "a b");
    assert_eq!(on_string(&rt, StringMethod::TrimStart, "  a  ", &[]), "a  ");
    assert_eq!(on_string(&rt, StringMethod::TrimEnd, "  a  ", &[]), "  a");
    assert_eq!(
        on_string(&rt, StringMethod::TrimStart, "--a--", &[string(&rt, "-")]),
        "a--"
    );
    assert_eq!(
        on_string(&rt, StringMethod::TrimEnd, "--a--", &[string(&rt, "-")]),
        "--a"
    );
    assert_eq!(
        on_string(&rt, StringMethod::TrimEnd, " a ", &[rt.make_none()]),
        " a",
        "a None pattern trims whitespace"
    );
}

#[test]
fn test_string_split() {
    let rt = runtime();
    assert_eq!(
        on_string(&rt, StringMethod::Split, "a,b,,c", &[string(&rt, ",")]),
        "[a, b, , c]"
    );
    assert_eq!(
        on_string(&rt, StringMethod::Split, "abc", &[string(&rt, "")]),
        "[a, b, c]"
    );
    assert_eq!(on_string(&rt, StringMethod::Lines, "one\ntwo\r\n", &[]), "[one, two]");
    assert_eq!(on_string(&rt, StringMethod::Chars, "hé", &[]), "[h, é]");
    assert_eq!(on_string(&rt, StringMethod::Chars, "", &[]), "[]");
}

#[test]
fn test_string_parse() {
    let rt = runtime();
    let parse_int = |s: &'static str, rest: &[Val]| {
        let mut args = vec![string(&rt, s)];
        args.extend_from_slice(rest);
        call(&rt, StringMethod::ParseInt.slot(), &args)
    };
    assert_eq!(parse_int("-42", &[]).as_int(), Some(-42));
    assert_eq!(parse_int("ff", &[rt.make_int(16)]).as_int(), Some(255));
    assert!(parse_int("12x", &[]).is_none());
    assert!(parse_int("12", &[rt.make_int(1)]).is_none());
    assert!(parse_int("12", &[rt.make_int(37)]).is_none());

    let parse_float = |s: &'static str| call(&rt, StringMethod::ParseFloat.slot(), &[string(&rt, s)]);
    assert_eq!(parse_float("2.5").as_float(), Some(2.5));
    assert!(parse_float("two").is_none());
}

#[test]
fn test_array_basics() {
    let rt = runtime();
    let empty = ints(&rt, &[]);
    let three = ints(&rt, &[1, 2, 3]);

    assert_eq!(call(&rt, ArrayMethod::Length.slot(), &[three.clone()]).as_int(), Some(3));
    assert_eq!(call(&rt, ArrayMethod::IsEmpty.slot(), &[empty]).as_bool(), Some(true));
    assert_eq!(call(&rt, ArrayMethod::IsEmpty.slot(), &[three.clone()]).as_bool(), Some(false));

    let pushed = call(&rt, ArrayMethod::Push.slot(), &[three.clone(), rt.make_int(4)]);
    assert!(pushed.is_none());
    assert_eq!(repr(&rt, &three), "[1, 2, 3, 4]");

    let joined = call(&rt, ArrayMethod::Concat.slot(), &[three.clone(), ints(&rt, &[5])]);
    assert_eq!(repr(&rt, &joined), "[1, 2, 3, 4, 5]");
    assert_eq!(repr(&rt, &three), "[1, 2, 3, 4]", "concat leaves the receiver alone");

    let err = rt
        .call_method(ArrayMethod::Concat.slot(), &[three, rt.make_int(5)])
        .expect_err("concat takes an Array");
    assert!(matches!(err, RuntimeError::Argument { index: 1, .. }));
}

#[test]
fn test_array_join() {
    let rt = runtime();
    let items: Val = rt
        .make_array([rt.make_int(1), string(&rt, "a"), rt.make_none(), ints(&rt, &[2])])
        .into();
    let join = |rest: &[Val]| {
        let mut args = vec![items.clone()];
        args.extend_from_slice(rest);
        repr(&rt, &call(&rt, ArrayMethod::Join.slot(), &args))
    };
    assert_eq!(join(&[string(&rt, ", ")]), "1, a, None, [2]");
    assert_eq!(join(&[]), "1aNone[2]");
    assert_eq!(join(&[rt.make_none()]), "1aNone[2]");
}

#[test]
fn test_array_contains_and_dedupe() {
    let rt = runtime();
    let items: Val = rt
        .make_array([
            rt.make_int(1),
            string(&rt, "a"),
            rt.make_int(1),
            ints(&rt, &[2]),
            string(&rt, "a"),
            ints(&rt, &[2]),
            rt.make_float(1.0),
        ])
        .into();

    let contains = |v: Val| {
        call(&rt, ArrayMethod::Contains.slot(), &[items.clone(), v])
            .as_bool()
            .expect("contains returns a Bool")
    };
    assert!(contains(string(&rt, "a")));
    assert!(contains(ints(&rt, &[2])));
    assert!(!contains(rt.make_int(2)));
    assert!(!contains(rt.make_bool(true)));

    let deduped = call(&rt, ArrayMethod::Dedupe.slot(), &[items]);
    assert_eq!(repr(&rt, &deduped), "[1, a, [2], 1]");
}

#[test]
fn test_array_enumerate() {
    let rt = runtime();
    let items: Val = rt.make_array([string(&rt, "x"), string(&rt, "y")]).into();
    let pairs = call(&rt, ArrayMethod::Enumerate.slot(), &[items]);
    assert_eq!(repr(&rt, &pairs), "[[x, 0], [y, 1]]");
}
