//! The `stdio.h` built-ins: `printf`, `scanf`, and `getchar`.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    ast::TypeName,
    error::{CodeLoc, Exception, RunResult},
    io::{InputReader, PrintWriter},
    memory::Memory,
    number::Number,
    value::Value,
};

use super::{Builtin, BuiltinSpec};

pub(crate) const FUNCTIONS: &[BuiltinSpec] = &[
    BuiltinSpec {
        name: "printf",
        builtin: Builtin::Printf,
        return_type: TypeName::Int,
        arg_types: None,
    },
    BuiltinSpec {
        name: "scanf",
        builtin: Builtin::Scanf,
        return_type: TypeName::Int,
        arg_types: None,
    },
    BuiltinSpec {
        name: "getchar",
        builtin: Builtin::Getchar,
        return_type: TypeName::Char,
        arg_types: Some(&[]),
    },
];

/// Conversion specifications `scanf` recognizes. The scan is permissive
/// (`%3d` and friends match) but only plain `d` conversions execute.
static SCANF_CONVERSIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%[^%]*?[dfi]").expect("scanf conversion pattern is valid"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// One parsed `printf` conversion.
struct Conversion {
    left_align: bool,
    zero_pad: bool,
    width: usize,
    precision: Option<usize>,
    kind: char,
}

fn pad(out: &mut String, text: &str, conv: &Conversion) {
    let fill = conv.width.saturating_sub(text.chars().count());
    if fill == 0 {
        out.push_str(text);
    } else if conv.left_align {
        out.push_str(text);
        out.extend(std::iter::repeat_n(' ', fill));
    } else {
        let pad_char = if conv.zero_pad { '0' } else { ' ' };
        out.extend(std::iter::repeat_n(pad_char, fill));
        out.push_str(text);
    }
}

fn format_arg(out: &mut String, conv: &Conversion, arg: &Value, position: CodeLoc) -> RunResult<()> {
    let number = || {
        arg.as_number().ok_or_else(|| {
            Exception::runtime(
                format!("printf: expected a numeric argument for %{}, found {}", conv.kind, arg.type_name()),
                position,
            )
        })
    };
    let text = match conv.kind {
        'd' | 'i' | 'u' => number()?.value().to_string(),
        'x' => format!("{:x}", number()?.value()),
        'X' => format!("{:X}", number()?.value()),
        'o' => format!("{:o}", number()?.value()),
        'c' => char::from(number()?.value() as u8).to_string(),
        'f' => format!("{:.*}", conv.precision.unwrap_or(6), f64::from(number()?.value())),
        's' => match arg {
            Value::Str(s) => s.clone(),
            other => {
                return Err(Exception::runtime(
                    format!("printf: expected a string argument for %s, found {}", other.type_name()),
                    position,
                ));
            }
        },
        other => {
            return Err(Exception::runtime(
                format!("printf: unsupported conversion '%{other}'"),
                position,
            ));
        }
    };
    pad(out, &text, conv);
    Ok(())
}

/// C-style formatted output. Returns the number of bytes written, as the C
/// function does.
pub(crate) fn printf(args: &[Value], print: &mut impl PrintWriter, position: CodeLoc) -> RunResult<Value> {
    let Some((Value::Str(fmt), params)) = args.split_first() else {
        return Err(Exception::runtime("printf: format must be a string literal", position));
    };

    let mut output = String::new();
    let mut params = params.iter();
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            output.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            output.push('%');
            continue;
        }
        let mut conv = Conversion {
            left_align: false,
            zero_pad: false,
            width: 0,
            precision: None,
            kind: ' ',
        };
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => conv.left_align = true,
                '0' => conv.zero_pad = true,
                _ => break,
            }
            chars.next();
        }
        while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
            conv.width = conv.width * 10 + d as usize;
            chars.next();
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut precision = 0;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                precision = precision * 10 + d as usize;
                chars.next();
            }
            conv.precision = Some(precision);
        }
        conv.kind = chars
            .next()
            .ok_or_else(|| Exception::runtime("printf: incomplete conversion at end of format", position))?;
        let arg = params
            .next()
            .ok_or_else(|| Exception::runtime("printf: too few arguments for format", position))?;
        format_arg(&mut output, &conv, arg, position)?;
    }
    if params.next().is_some() {
        return Err(Exception::runtime("printf: too many arguments for format", position));
    }

    let written = Number::new(output.len() as u32);
    print.stdout_write(&output)?;
    Ok(Value::Num(written))
}

/// Reads whitespace-separated fields from input and assigns them through the
/// pseudo-addresses supplied as arguments. Only `%d` conversions execute.
pub(crate) fn scanf(
    args: &[Value],
    memory: &mut Memory,
    input: &mut impl InputReader,
    position: CodeLoc,
) -> RunResult<Value> {
    let Some((Value::Str(fmt), params)) = args.split_first() else {
        return Err(Exception::runtime("scanf: format must be a string literal", position));
    };

    let fmt = WHITESPACE.replace_all(fmt, "");
    let conversions: Vec<&str> = SCANF_CONVERSIONS.find_iter(&fmt).map(|m| m.as_str()).collect();
    if conversions.len() != params.len() {
        return Err(Exception::runtime(
            format!(
                "Format of scanf function takes {} positional arguments but {} were given",
                conversions.len(),
                params.len()
            ),
            position,
        ));
    }

    let mut assigned = 0u32;
    for (conversion, param) in conversions.iter().zip(params) {
        if !conversion.ends_with('d') {
            return Err(Exception::runtime(
                format!("You are not allowed to use '{conversion}' conversions in scanf"),
                position,
            ));
        }
        let Value::Addr(name) = param else {
            return Err(Exception::runtime(
                format!("scanf: expected an address argument for {conversion}, found {}", param.type_name()),
                position,
            ));
        };
        let field = input
            .read_field()?
            .ok_or_else(|| Exception::runtime("scanf: unexpected end of input", position))?;
        let parsed: i64 = field
            .parse()
            .map_err(|_| Exception::runtime(format!("scanf: invalid input '{field}' for %d"), position))?;
        if !memory.set(name, Value::Num(Number::new(parsed as u32))) {
            return Err(Exception::runtime(format!("Unknown identifier '{name}'"), position));
        }
        assigned += 1;
    }
    Ok(Value::Num(Number::new(assigned)))
}

/// Reads one byte from input; yields `(char) -1` at end of input, as C's
/// `getchar` reports EOF.
pub(crate) fn getchar(input: &mut impl InputReader) -> RunResult<Value> {
    let value = match input.read_char()? {
        Some(byte) => Number::new(u32::from(byte)),
        None => Number::new(u32::MAX),
    };
    Ok(Value::Num(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{CollectStringPrint, StrInput};

    fn loc() -> CodeLoc {
        CodeLoc::new(1, 1)
    }

    fn fmt_args(fmt: &str, values: &[u32]) -> Vec<Value> {
        let mut args = vec![Value::Str(fmt.to_owned())];
        args.extend(values.iter().map(|&v| Value::Num(Number::new(v))));
        args
    }

    #[test]
    fn printf_formats_and_returns_length() {
        let mut out = CollectStringPrint::new();
        let result = printf(&fmt_args("%d %d!", &[1, 2]), &mut out, loc()).unwrap();
        assert_eq!(out.output(), "1 2!");
        assert_eq!(result, Value::Num(Number::new(4)));
    }

    #[test]
    fn printf_width_and_padding() {
        let mut out = CollectStringPrint::new();
        printf(&fmt_args("[%4d][%-4d][%04d]", &[7, 7, 7]), &mut out, loc()).unwrap();
        assert_eq!(out.output(), "[   7][7   ][0007]");
    }

    #[test]
    fn printf_hex_char_percent_and_float() {
        let mut out = CollectStringPrint::new();
        printf(&fmt_args("%x %c %% %.2f", &[255, 65, 3]), &mut out, loc()).unwrap();
        assert_eq!(out.output(), "ff A % 3.00");
    }

    #[test]
    fn printf_argument_count_mismatch_is_a_runtime_error() {
        let mut out = CollectStringPrint::new();
        let err = printf(&fmt_args("%d %d", &[1]), &mut out, loc()).unwrap_err();
        assert!(err.message.contains("too few arguments"));
        let err = printf(&fmt_args("%d", &[1, 2]), &mut out, loc()).unwrap_err();
        assert!(err.message.contains("too many arguments"));
    }

    #[test]
    fn scanf_assigns_through_addresses() {
        let mut memory = Memory::new();
        memory.declare("a", Value::Num(Number::ZERO));
        memory.declare("b", Value::Num(Number::ZERO));
        let mut input = StrInput::new("12  -3\n");
        let args = vec![
            Value::Str("%d %d".to_owned()),
            Value::Addr("a".to_owned()),
            Value::Addr("b".to_owned()),
        ];
        let count = scanf(&args, &mut memory, &mut input, loc()).unwrap();
        assert_eq!(count, Value::Num(Number::new(2)));
        assert_eq!(memory.get("a"), Some(&Value::Num(Number::new(12))));
        assert_eq!(memory.get("b"), Some(&Value::Num(Number::new(3u32.wrapping_neg()))));
    }

    #[test]
    fn scanf_rejects_non_d_conversions() {
        let mut memory = Memory::new();
        memory.declare("a", Value::Num(Number::ZERO));
        let mut input = StrInput::new("1.5");
        let args = vec![Value::Str("%f".to_owned()), Value::Addr("a".to_owned())];
        let err = scanf(&args, &mut memory, &mut input, loc()).unwrap_err();
        assert!(err.message.contains("not allowed"));
    }

    #[test]
    fn getchar_reads_bytes_then_eof() {
        let mut input = StrInput::new("A");
        assert_eq!(getchar(&mut input).unwrap(), Value::Num(Number::new(65)));
        assert_eq!(getchar(&mut input).unwrap(), Value::Num(Number::new(u32::MAX)));
    }
}
