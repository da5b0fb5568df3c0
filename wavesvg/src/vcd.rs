// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Reads a VCD into a flat list of declaration and simulation commands. No interpretation of
// scopes or values happens here, see `trace.rs` for that.

use std::io::{BufRead, Read};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum VcdParseError {
    #[error("[vcd] expected command to start with `$`, not `{0}`")]
    VcdStartChar(String),
    #[error("[vcd] unknown or invalid command: `{0}`, valid are: {list:?}", list=get_vcd_command_str())]
    VcdInvalidCommand(String),
    #[error("[vcd] unexpected number of tokens for command {0}: {1}")]
    VcdUnexpectedNumberOfTokens(String, String),
    #[error("[vcd] encountered an attribute with an unsupported type: {0}")]
    VcdUnsupportedAttributeType(String),
    #[error("[vcd] unexpected token in VCD body: {0}")]
    VcdUnexpectedBodyToken(String),
    #[error("[vcd] expected an id for a value change, but did not find one")]
    VcdEmptyId,
    #[error("[vcd] unexpected end of input, the header was never closed by `$enddefinitions`")]
    VcdUnexpectedEof,
    #[error("failed to decode string")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("failed to parse an integer")]
    ParseInt(#[from] std::num::ParseIntError),
    #[error("I/O operation failed")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VcdParseError>;

/// Informational header entries. None of them influence the rendered waveform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct VcdHeader {
    pub date: Option<String>,
    pub version: Option<String>,
    pub timescale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum DeclarationCmd {
    /// `$scope <tpe> <name> $end`
    Scope { tpe: String, name: String },
    /// `$upscope $end`
    UpScope,
    /// `$var <tpe> <size> <code> <name> $end`
    Var {
        tpe: String,
        size: String,
        code: String,
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum SimulationCmd {
    Time(u64),
    ScalarChange { code: String, value: String },
    /// The value keeps its format prefix, e.g. `b1010`.
    VectorChange { code: String, value: String },
}

/// Syntax tree of a complete VCD.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct VcdFile {
    pub header: VcdHeader,
    pub declarations: Vec<DeclarationCmd>,
    pub simulation: Vec<SimulationCmd>,
}

/// Parses a complete VCD held in memory.
pub fn parse(input: &[u8]) -> Result<VcdFile> {
    parse_from_reader(input)
}

pub fn parse_from_reader(mut input: impl BufRead) -> Result<VcdFile> {
    let mut header = VcdHeader::default();
    let mut declarations = Vec::new();

    let callback = |cmd: HeaderCmd| -> Result<()> {
        match cmd {
            HeaderCmd::Scope(tpe, name) => declarations.push(DeclarationCmd::Scope {
                tpe: std::str::from_utf8(tpe)?.to_string(),
                name: std::str::from_utf8(name)?.to_string(),
            }),
            HeaderCmd::UpScope => declarations.push(DeclarationCmd::UpScope),
            HeaderCmd::Var(tpe, size, code, name) => declarations.push(DeclarationCmd::Var {
                tpe: std::str::from_utf8(tpe)?.to_string(),
                size: std::str::from_utf8(size)?.to_string(),
                code: std::str::from_utf8(code)?.to_string(),
                name: String::from_utf8(name).map_err(|e| e.utf8_error())?,
            }),
            HeaderCmd::Date(value) => {
                header.date = Some(String::from_utf8_lossy(value).to_string());
            }
            HeaderCmd::Version(value) => {
                header.version = Some(String::from_utf8_lossy(value).to_string());
            }
            HeaderCmd::Timescale(value) => {
                header.timescale = Some(String::from_utf8_lossy(&value).to_string());
            }
            HeaderCmd::Comment => {}
        }
        Ok(())
    };
    read_vcd_header(&mut input, callback)?;

    let mut simulation = Vec::new();
    parse_body(&mut input, &mut simulation)?;

    tracing::debug!(
        declarations = declarations.len(),
        commands = simulation.len(),
        "parsed vcd"
    );
    Ok(VcdFile {
        header,
        declarations,
        simulation,
    })
}

#[inline]
fn unexpected_n_tokens(cmd: &str, tokens: &[&[u8]]) -> VcdParseError {
    VcdParseError::VcdUnexpectedNumberOfTokens(
        cmd.to_string(),
        iter_bytes_to_list_str(tokens.iter()),
    )
}

fn read_vcd_header(
    input: &mut impl BufRead,
    mut callback: impl FnMut(HeaderCmd) -> Result<()>,
) -> Result<()> {
    let mut buf: Vec<u8> = Vec::with_capacity(128);
    loop {
        buf.clear();
        let (cmd, body) = read_command(input, &mut buf)?;
        let parsed = match cmd {
            VcdCmd::Scope => {
                let tokens = find_tokens(body);
                let Some(tpe) = tokens.first().copied() else {
                    return Err(unexpected_n_tokens("scope", &tokens));
                };
                let name = tokens.get(1).cloned().unwrap_or(&[] as &[u8]);
                HeaderCmd::Scope(tpe, name)
            }
            VcdCmd::Var => {
                let tokens = find_tokens(body);
                if tokens.len() < 4 {
                    return Err(unexpected_n_tokens("variable", &tokens));
                }
                // names like `data [7:0]` are spread over several tokens
                let name = tokens[3..].join(&b' ');
                HeaderCmd::Var(tokens[0], tokens[1], tokens[2], name)
            }
            VcdCmd::UpScope => HeaderCmd::UpScope,
            VcdCmd::Date => HeaderCmd::Date(body),
            VcdCmd::Comment => HeaderCmd::Comment,
            VcdCmd::Version => HeaderCmd::Version(body),
            VcdCmd::Timescale => {
                let tokens = find_tokens(body);
                if tokens.is_empty() || tokens.len() > 2 {
                    return Err(unexpected_n_tokens("timescale", &tokens));
                }
                HeaderCmd::Timescale(tokens.concat())
            }
            VcdCmd::EndDefinitions => {
                // header is done
                return Ok(());
            }
            VcdCmd::Attribute => {
                let tokens = find_tokens(body);
                match tokens.first().copied() {
                    Some(b"misc") => HeaderCmd::Comment,
                    _ => {
                        return Err(VcdParseError::VcdUnsupportedAttributeType(
                            iter_bytes_to_list_str(tokens.iter()),
                        ))
                    }
                }
            }
            VcdCmd::AttributeEnd => {
                // Empty command directly followed by $end
                continue;
            }
        };
        callback(parsed)?;
    }
}

const VCD_DATE: &[u8] = b"date";
const VCD_TIMESCALE: &[u8] = b"timescale";
const VCD_VAR: &[u8] = b"var";
const VCD_SCOPE: &[u8] = b"scope";
const VCD_UP_SCOPE: &[u8] = b"upscope";
const VCD_COMMENT: &[u8] = b"comment";
const VCD_VERSION: &[u8] = b"version";
const VCD_END_DEFINITIONS: &[u8] = b"enddefinitions";
/// Unofficial extension emitted by some VHDL simulators.
const VCD_ATTRIBUTE_BEGIN: &[u8] = b"attrbegin";
const VCD_ATTRIBUTE_END: &[u8] = b"attrend";
const VCD_COMMANDS: [&[u8]; 10] = [
    VCD_DATE,
    VCD_TIMESCALE,
    VCD_VAR,
    VCD_SCOPE,
    VCD_UP_SCOPE,
    VCD_COMMENT,
    VCD_VERSION,
    VCD_END_DEFINITIONS,
    VCD_ATTRIBUTE_BEGIN,
    VCD_ATTRIBUTE_END,
];

/// Used to show all commands when printing an error message.
fn get_vcd_command_str() -> String {
    iter_bytes_to_list_str(VCD_COMMANDS.iter())
}

fn iter_bytes_to_list_str<'a, I>(bytes: I) -> String
where
    I: Iterator<Item = &'a &'a [u8]>,
{
    bytes
        .map(|c| String::from_utf8_lossy(c))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, PartialEq)]
enum VcdCmd {
    Date,
    Timescale,
    Var,
    Scope,
    UpScope,
    Comment,
    Version,
    EndDefinitions,
    Attribute,
    AttributeEnd,
}

impl VcdCmd {
    fn from_bytes(name: &[u8]) -> Option<Self> {
        match name {
            VCD_VAR => Some(VcdCmd::Var),
            VCD_SCOPE => Some(VcdCmd::Scope),
            VCD_UP_SCOPE => Some(VcdCmd::UpScope),
            VCD_DATE => Some(VcdCmd::Date),
            VCD_TIMESCALE => Some(VcdCmd::Timescale),
            VCD_COMMENT => Some(VcdCmd::Comment),
            VCD_VERSION => Some(VcdCmd::Version),
            VCD_END_DEFINITIONS => Some(VcdCmd::EndDefinitions),
            VCD_ATTRIBUTE_BEGIN => Some(VcdCmd::Attribute),
            VCD_ATTRIBUTE_END => Some(VcdCmd::AttributeEnd),
            _ => None,
        }
    }
}

enum HeaderCmd<'a> {
    Date(&'a [u8]),
    Version(&'a [u8]),
    Comment,
    Timescale(Vec<u8>),
    Scope(&'a [u8], &'a [u8]), // tpe, name
    UpScope,
    Var(&'a [u8], &'a [u8], &'a [u8], Vec<u8>), // tpe, size, id, name
}

/// Reads in a command until the `$end`. Uses buf to store the read data.
/// Returns the name and the body of the command.
fn read_command<'a>(input: &mut impl BufRead, buf: &'a mut Vec<u8>) -> Result<(VcdCmd, &'a [u8])> {
    debug_assert!(buf.is_empty());

    // skip over any preceding whitespace
    let start_char = skip_whitespace(input)?;

    if start_char != b'$' {
        return Err(VcdParseError::VcdStartChar(
            String::from_utf8_lossy(&[start_char]).to_string(),
        ));
    }

    // read the rest of the command into the buffer
    read_token(input, buf)?;

    let cmd = VcdCmd::from_bytes(buf).ok_or_else(|| {
        VcdParseError::VcdInvalidCommand(String::from_utf8_lossy(buf).to_string())
    })?;
    buf.clear();

    read_until_end_token(input, buf)?;

    Ok((cmd, &buf[..]))
}

#[inline]
fn find_tokens(line: &[u8]) -> Vec<&[u8]> {
    line.split(|c| is_white_space(*c))
        .filter(|e| !e.is_empty())
        .collect()
}

#[inline]
fn read_until_end_token(input: &mut impl BufRead, buf: &mut Vec<u8>) -> Result<()> {
    // count how many characters of the $end token we have recognized
    let mut end_index = 0;
    // we skip any whitespace at the beginning, but not between tokens
    let mut skipping_preceding_whitespace = true;
    loop {
        let byte = read_byte(input)?;
        if skipping_preceding_whitespace {
            if is_white_space(byte) {
                continue;
            }
            skipping_preceding_whitespace = false;
        }
        // we always append and then later drop the `$end` bytes.
        buf.push(byte);
        end_index = match (end_index, byte) {
            (_, b'$') => 1,
            (1, b'e') => 2,
            (2, b'n') => 3,
            (3, b'd') => {
                buf.truncate(buf.len() - 4); // drop $end
                right_strip(buf);
                return Ok(());
            }
            _ => 0, // reset
        };
    }
}

#[inline]
fn read_token(input: &mut impl BufRead, buf: &mut Vec<u8>) -> Result<()> {
    loop {
        let byte = read_byte(input)?;
        if is_white_space(byte) {
            return Ok(());
        }
        buf.push(byte);
    }
}

/// Advances the input until the first non-whitespace character which is then returned.
#[inline]
fn skip_whitespace(input: &mut impl BufRead) -> Result<u8> {
    loop {
        let byte = read_byte(input)?;
        if !is_white_space(byte) {
            return Ok(byte);
        }
    }
}

#[inline]
fn read_byte(input: &mut impl BufRead) -> Result<u8> {
    let mut buf = [0u8; 1];
    match input.read_exact(&mut buf) {
        Ok(()) => Ok(buf[0]),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(VcdParseError::VcdUnexpectedEof)
        }
        Err(e) => Err(e.into()),
    }
}

#[inline]
fn right_strip(buf: &mut Vec<u8>) {
    while buf.last().is_some_and(|b| is_white_space(*b)) {
        buf.pop();
    }
}

#[inline]
fn is_white_space(b: u8) -> bool {
    matches!(b, b' ' | b'\n' | b'\r' | b'\t')
}

enum FirstTokenResult {
    Time(u64),
    OneBitValue,
    MultiBitValue,
    CommentStart,
    IgnoredCmd,
}

fn parse_first_token(token: &[u8]) -> Result<FirstTokenResult> {
    match token[0] {
        b'#' => {
            let value_str = std::str::from_utf8(&token[1..])?;
            // some simulators print integral times as floats
            let value = match value_str.parse::<u64>() {
                Ok(val) => Ok(val),
                Err(e) => match value_str.parse::<f64>() {
                    Ok(val) if val.fract() == 0.0 && val >= 0.0 => Ok(val as u64),
                    _ => Err(e),
                },
            }?;
            Ok(FirstTokenResult::Time(value))
        }
        b'0' | b'1' | b'z' | b'Z' | b'x' | b'X' | b'h' | b'H' | b'u' | b'U' | b'w' | b'W'
        | b'l' | b'L' | b'-' => Ok(FirstTokenResult::OneBitValue),
        b'b' | b'B' | b'r' | b'R' | b's' | b'S' => Ok(FirstTokenResult::MultiBitValue),
        _ => match token {
            b"$comment" => Ok(FirstTokenResult::CommentStart),
            b"$dumpvars" | b"$dumpall" | b"$end" | b"$dumpoff" | b"$dumpon" => {
                Ok(FirstTokenResult::IgnoredCmd)
            }
            _ => Err(VcdParseError::VcdUnexpectedBodyToken(
                String::from_utf8_lossy(token).to_string(),
            )),
        },
    }
}

trait ParseBodyOutput {
    fn time(&mut self, value: u64) -> Result<()>;
    fn scalar(&mut self, value: &[u8], id: &[u8]) -> Result<()>;
    fn vector(&mut self, value: &[u8], id: &[u8]) -> Result<()>;
}

impl ParseBodyOutput for Vec<SimulationCmd> {
    #[inline]
    fn time(&mut self, value: u64) -> Result<()> {
        self.push(SimulationCmd::Time(value));
        Ok(())
    }

    #[inline]
    fn scalar(&mut self, value: &[u8], id: &[u8]) -> Result<()> {
        if id.is_empty() {
            return Err(VcdParseError::VcdEmptyId);
        }
        self.push(SimulationCmd::ScalarChange {
            code: std::str::from_utf8(id)?.to_string(),
            value: std::str::from_utf8(value)?.to_string(),
        });
        Ok(())
    }

    #[inline]
    fn vector(&mut self, value: &[u8], id: &[u8]) -> Result<()> {
        if id.is_empty() {
            return Err(VcdParseError::VcdEmptyId);
        }
        self.push(SimulationCmd::VectorChange {
            code: std::str::from_utf8(id)?.to_string(),
            value: std::str::from_utf8(value)?.to_string(),
        });
        Ok(())
    }
}

fn parse_body(input: &mut impl BufRead, out: &mut impl ParseBodyOutput) -> Result<()> {
    let mut state = BodyState::ParsingFirstToken;

    let mut first = Vec::with_capacity(32);
    let mut id = Vec::with_capacity(32);

    for b in input.bytes() {
        let b = b?;
        match state {
            BodyState::ParsingFirstToken => {
                if is_white_space(b) {
                    if !first.is_empty() {
                        state = match parse_first_token(&first)? {
                            FirstTokenResult::Time(value) => {
                                out.time(value)?;
                                BodyState::ParsingFirstToken
                            }
                            FirstTokenResult::OneBitValue => {
                                out.scalar(&first[0..1], &first[1..])?;
                                BodyState::ParsingFirstToken
                            }
                            FirstTokenResult::MultiBitValue => BodyState::ParsingIdToken,
                            FirstTokenResult::CommentStart => BodyState::LookingForEndToken,
                            FirstTokenResult::IgnoredCmd => BodyState::ParsingFirstToken,
                        };

                        // the value is still needed once the id has been read
                        if state != BodyState::ParsingIdToken {
                            first.clear();
                        }
                    }
                } else {
                    first.push(b);
                }
            }
            BodyState::ParsingIdToken => {
                if is_white_space(b) {
                    if !id.is_empty() {
                        out.vector(&first, &id)?;
                        first.clear();
                        id.clear();
                        state = BodyState::ParsingFirstToken;
                    }
                } else {
                    id.push(b);
                }
            }
            BodyState::LookingForEndToken => {
                if is_white_space(b) {
                    if !first.is_empty() {
                        if first == b"$end" {
                            state = BodyState::ParsingFirstToken;
                        }
                        first.clear();
                    }
                } else {
                    first.push(b);
                }
            }
        }
    }

    // we reached the end of the input
    match state {
        BodyState::ParsingFirstToken => {
            if !first.is_empty() {
                match parse_first_token(&first)? {
                    FirstTokenResult::Time(value) => out.time(value)?,
                    FirstTokenResult::OneBitValue => out.scalar(&first[0..1], &first[1..])?,
                    FirstTokenResult::MultiBitValue => return Err(VcdParseError::VcdEmptyId),
                    _ => {} // nothing to do
                };
            }
        }
        BodyState::ParsingIdToken => out.vector(&first, &id)?,
        BodyState::LookingForEndToken => {}
    }
    Ok(())
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum BodyState {
    ParsingFirstToken,
    ParsingIdToken,
    LookingForEndToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    impl ParseBodyOutput for Vec<String> {
        fn time(&mut self, value: u64) -> Result<()> {
            self.push(format!("Time({value})"));
            Ok(())
        }

        fn scalar(&mut self, value: &[u8], id: &[u8]) -> Result<()> {
            let desc = format!(
                "{} = {}",
                std::str::from_utf8(id)?,
                std::str::from_utf8(value)?
            );
            self.push(desc);
            Ok(())
        }

        fn vector(&mut self, value: &[u8], id: &[u8]) -> Result<()> {
            let desc = format!(
                "{} := {}",
                std::str::from_utf8(id)?,
                std::str::from_utf8(value)?
            );
            self.push(desc);
            Ok(())
        }
    }

    fn read_body_to_vec(input: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        parse_body(&mut std::io::Cursor::new(input), &mut out).unwrap();
        out
    }

    #[test]
    fn test_read_body() {
        let input = r#"
$dumpvars
1I,!
1J,!
$end
#2678437829
b00 D2!
b10100 g2!
$comment ignore #5 me $end
x(i"
#7.0
0j2!"#;
        let expected = vec![
            "I,! = 1",
            "J,! = 1",
            "Time(2678437829)",
            "D2! := b00",
            "g2! := b10100",
            "(i\" = x",
            "Time(7)",
            "j2! = 0",
        ];
        let res = read_body_to_vec(input.as_bytes());
        assert_eq!(res, expected);
    }

    #[test]
    fn test_read_body_rejects_unknown_token() {
        let mut out: Vec<String> = Vec::new();
        let res = parse_body(&mut std::io::Cursor::new(b"#0\n?x\n"), &mut out);
        assert!(matches!(res, Err(VcdParseError::VcdUnexpectedBodyToken(t)) if t == "?x"));
    }

    #[test]
    fn test_read_body_rejects_fractional_time() {
        let mut out: Vec<String> = Vec::new();
        let res = parse_body(&mut std::io::Cursor::new(b"#1.5\n"), &mut out);
        assert!(matches!(res, Err(VcdParseError::ParseInt(_))));
    }

    #[test]
    fn test_read_command() {
        let mut buf = Vec::with_capacity(128);
        let input_0 = b"$upscope $end";
        let (cmd_0, body_0) = read_command(&mut input_0.as_slice(), &mut buf).unwrap();
        assert_eq!(cmd_0, VcdCmd::UpScope);
        assert!(body_0.is_empty());

        // test with more whitespace
        buf.clear();
        let input_1 = b" \t $upscope \n $end  \n ";
        let (cmd_1, body_1) = read_command(&mut input_1.as_slice(), &mut buf).unwrap();
        assert_eq!(cmd_1, VcdCmd::UpScope);
        assert!(body_1.is_empty());

        // a `$` inside the body restarts the end token search
        buf.clear();
        let input_2 = b"$comment cost $$end";
        let (cmd_2, body_2) = read_command(&mut input_2.as_slice(), &mut buf).unwrap();
        assert_eq!(cmd_2, VcdCmd::Comment);
        assert_eq!(body_2, b"cost $");
    }

    #[test]
    fn test_parse_header_and_body() {
        let input = b"$date today $end
$timescale 1 ns $end
$scope module top $end
$var wire 8 # data [7:0] $end
$var wire 1 ! clk $end
$upscope $end
$enddefinitions $end
#0
b00001111 #
1!
";
        let file = parse(input).unwrap();
        assert_eq!(file.header.date.as_deref(), Some("today"));
        assert_eq!(file.header.timescale.as_deref(), Some("1ns"));
        assert_eq!(
            file.declarations,
            vec![
                DeclarationCmd::Scope {
                    tpe: "module".to_string(),
                    name: "top".to_string()
                },
                DeclarationCmd::Var {
                    tpe: "wire".to_string(),
                    size: "8".to_string(),
                    code: "#".to_string(),
                    name: "data [7:0]".to_string()
                },
                DeclarationCmd::Var {
                    tpe: "wire".to_string(),
                    size: "1".to_string(),
                    code: "!".to_string(),
                    name: "clk".to_string()
                },
                DeclarationCmd::UpScope,
            ]
        );
        assert_eq!(
            file.simulation,
            vec![
                SimulationCmd::Time(0),
                SimulationCmd::VectorChange {
                    code: "#".to_string(),
                    value: "b00001111".to_string()
                },
                SimulationCmd::ScalarChange {
                    code: "!".to_string(),
                    value: "1".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse(b"$This is not a VCD$"),
            Err(VcdParseError::VcdInvalidCommand(c)) if c == "This"
        ));
        assert!(matches!(
            parse(b"hello world"),
            Err(VcdParseError::VcdStartChar(c)) if c == "h"
        ));
        assert!(matches!(parse(b""), Err(VcdParseError::VcdUnexpectedEof)));
        assert!(matches!(
            parse(b"$scope module top $end"),
            Err(VcdParseError::VcdUnexpectedEof)
        ));
        assert!(matches!(
            parse(b"$var wire 1 ! $end $enddefinitions $end"),
            Err(VcdParseError::VcdUnexpectedNumberOfTokens(..))
        ));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn test_parse_from_reader() {
        let input = b"$var wire 1 ! clk $end $enddefinitions $end\n#0\n1!\n";
        let file = parse_from_reader(std::io::BufReader::new(&input[..])).unwrap();
        assert_eq!(file.declarations.len(), 1);
        assert_eq!(file.simulation.len(), 2);

        let res = parse_from_reader(std::io::BufReader::new(FailingReader));
        assert!(matches!(res, Err(VcdParseError::Io(e)) if e.to_string() == "disk on fire"));
    }
}
