/// Expand backslash escapes in a string value as served by a remote source.
///
/// Recognises the C character escapes (`\a \b \f \n \r \t \v \\`), `\?` for DEL, `\xHH` with one
/// or two hex digits and `\OOO` with exactly three octal digits. Any other escaped character
/// stands for itself, and a trailing lone backslash is kept. The result is never longer than the
/// input.
pub fn expand_escapes(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        i += 1;
        let Some(&c) = bytes.get(i) else {
            out.push(b'\\');
            break;
        };
        match c {
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'v' => out.push(0x0b),
            b'\\' => out.push(b'\\'),
            b'?' => out.push(0x7f),
            b'x' => {
                let digits = bytes[i + 1..]
                    .iter()
                    .take(2)
                    .take_while(|b| b.is_ascii_hexdigit())
                    .count();
                let value = bytes[i + 1..i + 1 + digits]
                    .iter()
                    .fold(0u8, |acc, b| (acc << 4) | hex_value(*b));
                out.push(value);
                i += digits;
            }
            b'0'..=b'7' => {
                let octal = bytes
                    .get(i..i + 3)
                    .filter(|run| run.iter().all(|b| (b'0'..=b'7').contains(b)));
                match octal {
                    Some(run) => {
                        let value = run
                            .iter()
                            .fold(0u32, |acc, b| (acc << 3) | u32::from(b - b'0'));
                        out.push(value as u8);
                        i += 2;
                    }
                    // not a full octal escape: the digit is kept, the backslash dropped
                    None => out.push(c),
                }
            }
            other => out.push(other),
        }
        i += 1;
    }
    out
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn c_escapes() {
        assert_eq!(expand_escapes(r"a\tb\nc"), b"a\tb\nc".to_vec());
        assert_eq!(expand_escapes(r"\a\b\f\r\v"), vec![7, 8, 12, 13, 11]);
        assert_eq!(expand_escapes(r"back\\slash"), b"back\\slash".to_vec());
        assert_eq!(expand_escapes(r"\?"), vec![0x7f]);
    }

    #[test]
    fn numeric_escapes() {
        assert_eq!(expand_escapes(r"\x41\x4a!"), b"AJ!".to_vec());
        assert_eq!(expand_escapes(r"\x7z"), b"\x07z".to_vec());
        assert_eq!(expand_escapes(r"\x"), vec![0]);
        assert_eq!(expand_escapes(r"\101\060"), b"A0".to_vec());
        // short octal runs are not escapes
        assert_eq!(expand_escapes(r"\12x"), b"12x".to_vec());
    }

    #[test]
    fn odd_cases() {
        assert_eq!(expand_escapes(r"\q"), b"q".to_vec());
        assert_eq!(expand_escapes("trailing\\"), b"trailing\\".to_vec());
        assert_eq!(expand_escapes(""), Vec::<u8>::new());
    }

    proptest! {
        #[test]
        fn never_grows(s in ".*") {
            prop_assert!(expand_escapes(&s).len() <= s.len());
        }

        #[test]
        fn plain_text_is_untouched(s in "[a-zA-Z0-9 ,.]*") {
            prop_assert_eq!(expand_escapes(&s), s.as_bytes().to_vec());
        }
    }
}
