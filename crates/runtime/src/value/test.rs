use pretty_assertions::assert_eq;
use test_env_log::test;

use super::{normalize_index, normalize_range, Val};
use crate::gc::Gc;
use crate::runtime::Runtime;

fn runtime() -> Runtime {
    Runtime::with_builtins().expect("Failed to bootstrap runtime")
}

fn text(v: &Val) -> String {
    v.as_string()
        .expect("value should be a string")
        .as_str_lossy()
        .into_owned()
}

fn ints(rt: &Runtime, items: &[i64]) -> Gc<super::Array> {
    rt.make_array(items.iter().map(|&i| rt.make_int(i)))
}

fn int_items(array: &super::Array) -> Vec<i64> {
    array
        .to_vec()
        .iter()
        .map(|v| v.as_int().expect("element should be an int"))
        .collect()
}

#[test]
fn test_normalize_index() {
    assert_eq!(normalize_index(0, 3), Some(0));
    assert_eq!(normalize_index(2, 3), Some(2));
    assert_eq!(normalize_index(-1, 3), Some(2));
    assert_eq!(normalize_index(-3, 3), Some(0));
    assert_eq!(normalize_index(3, 3), None);
    assert_eq!(normalize_index(-4, 3), None);
    assert_eq!(normalize_index(0, 0), None);
    assert_eq!(normalize_index(-1, 0), None);
}

#[test]
fn test_normalize_range() {
    assert_eq!(normalize_range(1, 3, 5), Some((1, 3)));
    assert_eq!(normalize_range(-3, -1, 5), Some((2, 4)));
    assert_eq!(normalize_range(0, 100, 5), Some((0, 5)));
    assert_eq!(normalize_range(-100, 2, 5), Some((0, 2)));
    assert_eq!(normalize_range(3, 1, 5), None);
    assert_eq!(normalize_range(5, 9, 5), None);
    assert_eq!(normalize_range(10, 3, 5), None);
    assert_eq!(normalize_range(2, -10, 5), None);
    assert_eq!(normalize_range(-1, 0, 0), None);
    assert_eq!(normalize_range(0, 0, 0), None);
}

/// The slice length is `max(0, end - start)` after the endpoints are resolved.
#[test]
fn test_range_length_matches_resolved_endpoints() {
    let len = 4_i64;
    for start in -6..=6 {
        for end in -6..=6 {
            let mut s = if start < 0 { (start + len).max(0) } else { start };
            let mut e = if end < 0 { end + len } else { end };
            if e < s {
                e = s;
            }
            e = e.min(len);
            s = s.min(len);
            let expected = (e - s).max(0) as usize;

            let actual = normalize_range(start, end, len as usize).map_or(0, |(s, e)| e - s);
            assert_eq!(actual, expected, "range {}..{}", start, end);
        }
    }
}

#[test]
fn test_string_get() {
    let rt = runtime();
    let s = rt.make_string("hello");

    assert_eq!(text(&s.get(&rt, 0)), "h");
    assert_eq!(text(&s.get(&rt, 4)), "o");
    assert_eq!(text(&s.get(&rt, -1)), "o");
    assert_eq!(text(&s.get(&rt, -5)), "h");

    for i in 0..5 {
        assert_eq!(text(&s.get(&rt, i)), text(&s.get(&rt, i - 5)));
    }
}

#[test]
fn test_string_get_out_of_range_is_none() {
    let rt = runtime();
    let none = rt.make_none();
    let s = rt.make_string("abc");

    for i in [3, 4, 100, -4, -100] {
        let v = s.get(&rt, i);
        assert!(v.is_none(), "index {} should be out of range", i);
        assert!(v.ptr_eq(&none), "out of range returns the None singleton");
    }

    let empty = rt.make_string("");
    assert!(empty.get(&rt, 0).ptr_eq(&none));
    assert!(empty.get(&rt, -1).ptr_eq(&none));
}

#[test]
fn test_string_get_range() {
    let rt = runtime();
    let s = rt.make_string("hello");

    assert_eq!(*s.get_range(&rt, 1, 3), "el");
    assert_eq!(*s.get_range(&rt, -3, -1), "ll");
    assert_eq!(*s.get_range(&rt, 0, 100), "hello");
    assert_eq!(*s.get_range(&rt, -100, 2), "he");
    assert_eq!(*s.get_range(&rt, 3, 1), "");
    assert_eq!(*s.get_range(&rt, 5, 10), "");

    let empty = rt.make_string("");
    assert_eq!(*empty.get_range(&rt, -1, 0), "");
    assert_eq!(*empty.get_range(&rt, 0, 3), "");
}

#[test]
fn test_string_get_range_is_a_fresh_string() {
    let rt = runtime();
    let s = rt.make_string("hello");
    let whole = s.get_range(&rt, 0, 5);

    assert_eq!(*whole, *s);
    assert!(!Gc::ptr_eq(&whole, &s));
    assert_eq!(whole.type_id(), rt.types().string);
}

#[test]
fn test_string_bytes() {
    let rt = runtime();
    let s = rt.make_string(&b"a\0b"[..]);
    assert_eq!(s.len(), 3);
    assert_eq!(s.as_bytes(), b"a\0b");
    assert_eq!(text(&s.get(&rt, 1)), "\0");
}

#[test]
fn test_concat_strings() {
    let rt = runtime();
    let a = rt.make_string("foo");
    let b = rt.make_string("bar");
    let c = rt.concat_strings(&a, &b);
    assert_eq!(*c, "foobar");
    assert_eq!(c.len(), 6);
    assert_eq!(*a, "foo");
}

#[test]
fn test_array_with_capacity() {
    let rt = runtime();
    let a = rt.make_array_with_capacity(2, 8);
    assert_eq!(a.len(), 2);
    assert_eq!(a.capacity(), 8);
    assert_eq!(a.type_id(), rt.types().array);

    a.set(0, rt.make_int(10));
    a.set(1, rt.make_int(20));
    assert_eq!(int_items(&a), vec![10, 20]);

    // Stores past the length but inside the capacity do not extend the array.
    a.set(5, rt.make_int(60));
    assert_eq!(a.len(), 2);
    assert!(a.get(&rt, 5).is_none());
}

#[test]
fn test_array_capacity_below_length() {
    let rt = runtime();
    let a = rt.make_array_with_capacity(3, 1);
    assert_eq!(a.len(), 3);
    assert_eq!(a.capacity(), 3, "capacity is raised to the length");

    let none = rt.make_none();
    assert!(a.to_vec().iter().all(|v| v.ptr_eq(&none)));

    a.set(2, rt.make_int(30));
    assert_eq!(a.get(&rt, -1).as_int(), Some(30));
}

#[test]
#[should_panic(expected = "beyond capacity")]
fn test_array_set_beyond_capacity() {
    let rt = runtime();
    let a = rt.make_array_with_capacity(1, 1);
    a.set(1, rt.make_int(1));
}

#[test]
fn test_array_get() {
    let rt = runtime();
    let none = rt.make_none();
    let a = ints(&rt, &[1, 2, 3]);

    assert_eq!(a.get(&rt, 0).as_int(), Some(1));
    assert_eq!(a.get(&rt, -1).as_int(), Some(3));
    assert_eq!(a.get(&rt, -3).as_int(), Some(1));
    assert!(a.get(&rt, 3).ptr_eq(&none));
    assert!(a.get(&rt, -4).ptr_eq(&none));

    let element = a.get(&rt, 1);
    assert!(element.ptr_eq(&a.get(&rt, -2)), "get returns the stored reference");
}

#[test]
fn test_array_get_range() {
    let rt = runtime();
    let a = ints(&rt, &[1, 2, 3, 4, 5]);

    let mid = a.get_range(&rt, 1, 4);
    assert_eq!(int_items(&mid), vec![2, 3, 4]);
    assert_eq!(mid.capacity(), 3);

    let tail = a.get_range(&rt, -2, 100);
    assert_eq!(int_items(&tail), vec![4, 5]);

    let empty = a.get_range(&rt, 4, 2);
    assert_eq!(empty.len(), 0);
    assert_eq!(empty.capacity(), 1);
    assert_eq!(empty.type_id(), rt.types().array);
}

#[test]
fn test_array_slice_shares_elements() {
    let rt = runtime();
    let inner = ints(&rt, &[1]);
    let outer = rt.make_array([Val::from(inner.clone()), rt.make_int(2)]);
    let slice = outer.get_range(&rt, 0, 2);

    // Mutating a shared element shows through both arrays.
    inner.set(0, rt.make_int(100));
    for array in [&outer, &slice] {
        let seen = array.get(&rt, 0);
        let seen = seen.as_array().expect("element should be an array");
        assert_eq!(int_items(seen), vec![100]);
    }

    // Reassigning a slot only touches one array.
    slice.set(1, rt.make_int(3));
    assert_eq!(outer.get(&rt, 1).as_int(), Some(2));
    assert_eq!(slice.get(&rt, 1).as_int(), Some(3));
    outer.set(0, rt.make_none());
    assert!(slice.get(&rt, 0).as_array().is_some());
}

#[test]
fn test_array_push() {
    let rt = runtime();
    let a = rt.make_array(Vec::new());
    assert_eq!(a.capacity(), 1);

    for i in 0..5 {
        a.push(&rt, rt.make_int(i));
    }
    assert_eq!(int_items(&a), vec![0, 1, 2, 3, 4]);
    assert_eq!(a.capacity(), 8);
}

#[test]
fn test_instance_fields() {
    let rt = runtime();
    let point = rt.make_instance(crate::gc::TypeId(6), vec![rt.make_int(1), rt.make_int(2)]);

    assert_eq!(point.field_count(), 2);
    assert_eq!(point.field(1).and_then(|v| v.as_int()), Some(2));
    assert!(point.field(2).is_none());

    let old = point.set_field(0, rt.make_int(10));
    assert_eq!(old.and_then(|v| v.as_int()), Some(1));
    assert_eq!(point.field(0).and_then(|v| v.as_int()), Some(10));
    assert!(point.set_field(5, rt.make_none()).is_none());
}

#[test]
fn test_val_accessors() {
    let rt = runtime();
    assert_eq!(rt.make_int(7).as_int(), Some(7));
    assert_eq!(rt.make_int(7).as_float(), None);
    assert_eq!(rt.make_float(1.5).as_float(), Some(1.5));
    assert_eq!(rt.make_bool(true).as_bool(), Some(true));
    assert_eq!(rt.make_none().kind_name(), "None");
    assert_eq!(format!("{:?}", rt.make_int(7)), "7");
    assert_eq!(format!("{:?}", Val::from(rt.make_string("a"))), "\"a\"");
    assert_eq!(format!("{:?}", Val::from(ints(&rt, &[1, 2]))), "Array(len = 2)");
}
