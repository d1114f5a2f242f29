//! Builtin functions callable from generated code.

use crate::error::RuntimeError;
use crate::runtime::Runtime;
use crate::value::Array;

impl Runtime {
    /// Print every value in `args`, separated by single spaces and followed by a newline.
    ///
    /// Each value goes through its `toString` slot. All of them are converted before anything is
    /// written, so a failing conversion leaves the output untouched.
    pub fn println(&self, args: &Array) -> Result<(), RuntimeError> {
        let reprs = args
            .to_vec()
            .iter()
            .map(|arg| self.call_to_string(arg))
            .collect::<Result<Vec<_>, _>>()?;

        self.with_output(|out| {
            for (i, repr) in reprs.iter().enumerate() {
                if i > 0 {
                    out.write_all(b" ")?;
                }
                out.write_all(repr.as_bytes())?;
            }
            out.write_all(b"\n")?;
            out.flush()
        })?;
        Ok(())
    }
}
