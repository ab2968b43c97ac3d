//! Host functions available to every program the driver runs.
//!
//! | name | type |
//! |------|------|
//! | `puts` | `fn(*char) -> int` |
//! | `putchar` | `fn(int) -> int` |
//! | `print_int` | `fn(long_long) -> void` |
//! | `print_uint` | `fn(uint64_t) -> void` |
//! | `add`, `sub`, `mul` | `fn(int, int) -> int` |
//!
//! Output goes to a shared [`Sink`], so tests can capture it.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use vela_backend::{HostFn, HostMemory, RtValue};
use vela_types::TypeId;

use crate::JitSession;

/// Where the runtime writes program output.
pub type Sink = Rc<RefCell<dyn Write>>;

/// Sink writing to the process's standard output.
pub fn stdout_sink() -> Sink {
    Rc::new(RefCell::new(std::io::stdout()))
}

fn write_to(sink: &Sink, bytes: &[u8]) -> Result<(), String> {
    sink.borrow_mut()
        .write_all(bytes)
        .map_err(|e| format!("write failed: {e}"))
}

fn int_arg(name: &str, args: &[RtValue], index: usize) -> Result<i64, String> {
    args.get(index)
        .and_then(RtValue::as_i64)
        .ok_or_else(|| format!("{name}: argument {index} is not an integer"))
}

/// Register the runtime host functions in `session`.
pub fn install_runtime(session: &mut JitSession, sink: Sink) -> vela_compile::Result<()> {
    let types = session.types().clone();
    let common = types.common();
    let int_bits = types.widths().int_bits();

    let mut table: Vec<(&str, TypeId, HostFn)> = Vec::new();

    let out = sink.clone();
    table.push((
        "puts",
        types.function(common.int, &[common.char_ptr], false),
        Rc::new(move |mem: &HostMemory<'_>, args: &[RtValue]| -> Result<RtValue, String> {
            let text = args
                .first()
                .and_then(RtValue::as_pointer)
                .and_then(|ptr| mem.read_str(ptr))
                .ok_or("puts: argument is not a string")?;
            write_to(&out, text.as_bytes())?;
            write_to(&out, b"\n")?;
            Ok(RtValue::int(int_bits, 0))
        }),
    ));

    let out = sink.clone();
    table.push((
        "putchar",
        types.function(common.int, &[common.int], false),
        Rc::new(move |_: &HostMemory<'_>, args: &[RtValue]| -> Result<RtValue, String> {
            let code = int_arg("putchar", args, 0)?;
            let ch = u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| format!("putchar: {code} is not a character"))?;
            let mut buf = [0u8; 4];
            write_to(&out, ch.encode_utf8(&mut buf).as_bytes())?;
            Ok(RtValue::int(int_bits, code))
        }),
    ));

    let out = sink.clone();
    table.push((
        "print_int",
        types.function(common.void, &[common.long_long], false),
        Rc::new(move |_: &HostMemory<'_>, args: &[RtValue]| -> Result<RtValue, String> {
            let value = int_arg("print_int", args, 0)?;
            write_to(&out, format!("{value}\n").as_bytes())?;
            Ok(RtValue::Void)
        }),
    ));

    let out = sink;
    table.push((
        "print_uint",
        types.function(common.void, &[common.uint64], false),
        Rc::new(move |_: &HostMemory<'_>, args: &[RtValue]| -> Result<RtValue, String> {
            let value = args
                .first()
                .and_then(RtValue::as_u64)
                .ok_or("print_uint: argument is not an integer")?;
            write_to(&out, format!("{value}\n").as_bytes())?;
            Ok(RtValue::Void)
        }),
    ));

    let binary = types.function(common.int, &[common.int, common.int], false);
    let arithmetic: [(&str, fn(i64, i64) -> i64); 3] = [
        ("add", i64::wrapping_add),
        ("sub", i64::wrapping_sub),
        ("mul", i64::wrapping_mul),
    ];
    for (name, op) in arithmetic {
        table.push((
            name,
            binary,
            Rc::new(move |_: &HostMemory<'_>, args: &[RtValue]| -> Result<RtValue, String> {
                let lhs = int_arg(name, args, 0)?;
                let rhs = int_arg(name, args, 1)?;
                Ok(RtValue::int(int_bits, op(lhs, rhs)))
            }),
        ));
    }

    for (name, ty, function) in table {
        session.add_host_function(name, ty, function)?;
    }
    tracing::debug!(count = session.native_symbols().len(), "runtime installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use vela_compile::SessionConfig;

    use crate::new_session;

    fn run(source: &str) -> String {
        let buf = Rc::new(RefCell::new(Vec::<u8>::new()));
        let mut session = new_session(SessionConfig::default(), buf.clone()).unwrap();
        session.run_source("test.vl", source.to_owned()).unwrap();
        let out = buf.borrow().clone();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn puts_appends_newline() {
        assert_eq!(run(r#"puts("hello");"#), "hello\n");
    }

    #[test]
    fn putchar_writes_one_character() {
        assert_eq!(run("putchar('o'); putchar('k');"), "ok");
    }

    #[test]
    fn arithmetic_and_printing() {
        assert_eq!(run("print_int(sub(2, mul(add(1, 2), 3)));"), "-7\n");
    }

    #[test]
    fn print_uint_reads_unsigned() {
        assert_eq!(run("print_uint(0xFFFFFFFFFFFFFFFF);"), "18446744073709551615\n");
    }

    #[test]
    fn runtime_symbols_are_registered() {
        let buf = Rc::new(RefCell::new(Vec::<u8>::new()));
        let session = new_session(SessionConfig::default(), buf).unwrap();
        for name in ["add", "mul", "print_int", "print_uint", "putchar", "puts", "sub"] {
            assert!(session.native_symbols().iter().any(|s| s == name), "{name}");
        }
    }
}
