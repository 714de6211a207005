//! Array header decoding
//!
//! Reads only the header of a `.npy` array stream:
//!
//! ```text
//! \x93NUMPY | major | minor | header_len (u16 LE for v1, u32 LE for v2/v3) | dict literal
//! ```
//!
//! The dict literal looks like
//! `{'descr': '<f4', 'fortran_order': False, 'shape': (128, 22, 19), }`.
//! The array body that follows is never touched.

use crate::error::NpyError;
use std::io::Read;

/// Magic prefix of every array stream
pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Upper bound on the header dict length we are willing to buffer
const MAX_HEADER_LEN: usize = 1 << 20;

/// Decoded array header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyHeader {
    /// dtype descriptor, e.g. `<f4` or `|u1`
    pub descr: String,

    /// Whether the body is stored column-major
    pub fortran_order: bool,

    /// Array shape
    pub shape: Vec<u64>,
}

impl NpyHeader {
    /// First shape dimension, `None` for scalars
    pub fn rows(&self) -> Option<u64> {
        self.shape.first().copied()
    }
}

/// Read the array header from the start of `reader`
pub fn read_header<R: Read>(reader: &mut R) -> Result<NpyHeader, NpyError> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if &magic != NPY_MAGIC {
        return Err(NpyError::BadMagic);
    }

    let mut version = [0u8; 2];
    reader.read_exact(&mut version)?;
    let (major, minor) = (version[0], version[1]);

    let header_len = match major {
        1 => {
            let mut len = [0u8; 2];
            reader.read_exact(&mut len)?;
            u16::from_le_bytes(len) as usize
        }
        2 | 3 => {
            let mut len = [0u8; 4];
            reader.read_exact(&mut len)?;
            u32::from_le_bytes(len) as usize
        }
        _ => return Err(NpyError::UnsupportedVersion { major, minor }),
    };

    if header_len > MAX_HEADER_LEN {
        return Err(NpyError::InvalidHeader(format!(
            "header length {} exceeds {} bytes",
            header_len, MAX_HEADER_LEN
        )));
    }

    let mut raw = vec![0u8; header_len];
    reader.read_exact(&mut raw)?;

    // v1/v2 headers are latin-1, v3 is utf-8
    let text = if major == 3 {
        String::from_utf8(raw)
            .map_err(|e| NpyError::InvalidHeader(format!("header is not utf-8: {}", e)))?
    } else {
        raw.iter().map(|&b| b as char).collect()
    };

    parse_header_dict(&text)
}

/// Parse the header dict literal into its three required fields
pub fn parse_header_dict(text: &str) -> Result<NpyHeader, NpyError> {
    let mut parser = LiteralParser::new(text);
    let entries = parser.parse_dict()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(NpyError::InvalidHeader(format!(
            "trailing data after dict at offset {}",
            parser.pos
        )));
    }

    let lookup = |key: &str| {
        entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or_else(|| NpyError::InvalidHeader(format!("missing key '{}'", key)))
    };

    let descr = match lookup("descr")? {
        Literal::Str(s) => s.clone(),
        other => other.to_python(),
    };

    let fortran_order = match lookup("fortran_order")? {
        Literal::Bool(b) => *b,
        other => {
            return Err(NpyError::InvalidHeader(format!(
                "fortran_order is not a bool: {}",
                other.to_python()
            )))
        }
    };

    let shape = match lookup("shape")? {
        Literal::Tuple(items) => items
            .iter()
            .map(|item| match item {
                Literal::Int(n) => Ok(*n),
                other => Err(NpyError::InvalidHeader(format!(
                    "shape dimension is not an integer: {}",
                    other.to_python()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        other => {
            return Err(NpyError::InvalidHeader(format!(
                "shape is not a tuple: {}",
                other.to_python()
            )))
        }
    };

    Ok(NpyHeader {
        descr,
        fortran_order,
        shape,
    })
}

/// The subset of Python literals that appear in array headers
#[derive(Debug, Clone, PartialEq, Eq)]
enum Literal {
    Str(String),
    Bool(bool),
    Int(u64),
    Tuple(Vec<Literal>),
    List(Vec<Literal>),
}

impl Literal {
    fn to_python(&self) -> String {
        match self {
            Literal::Str(s) => format!("'{}'", s),
            Literal::Bool(true) => "True".to_string(),
            Literal::Bool(false) => "False".to_string(),
            Literal::Int(n) => n.to_string(),
            Literal::Tuple(items) => {
                let inner: Vec<String> = items.iter().map(Literal::to_python).collect();
                if items.len() == 1 {
                    format!("({},)", inner[0])
                } else {
                    format!("({})", inner.join(", "))
                }
            }
            Literal::List(items) => {
                let inner: Vec<String> = items.iter().map(Literal::to_python).collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }
}

struct LiteralParser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            src: text.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, what: &str) -> NpyError {
        NpyError::InvalidHeader(format!("{} at offset {}", what, self.pos))
    }

    fn expect(&mut self, byte: u8) -> Result<(), NpyError> {
        self.skip_ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn parse_dict(&mut self) -> Result<Vec<(String, Literal)>, NpyError> {
        self.expect(b'{')?;
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(entries);
            }
            let key = match self.parse_value()? {
                Literal::Str(s) => s,
                _ => return Err(self.error("dict key is not a string")),
            };
            self.expect(b':')?;
            let value = self.parse_value()?;
            entries.push((key, value));

            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Literal, NpyError> {
        self.skip_ws();
        match self.peek() {
            Some(b'\'') | Some(b'"') => self.parse_string().map(Literal::Str),
            Some(b'(') => self.parse_sequence(b'(', b')').map(Literal::Tuple),
            Some(b'[') => self.parse_sequence(b'[', b']').map(Literal::List),
            Some(b) if b.is_ascii_digit() => self.parse_int().map(Literal::Int),
            Some(b) if b.is_ascii_alphabetic() => self.parse_ident(),
            _ => Err(self.error("unexpected token")),
        }
    }

    fn parse_string(&mut self) -> Result<String, NpyError> {
        let quote = self.src[self.pos];
        self.pos += 1;
        let mut out = Vec::new();
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'\\' => {
                    let escaped = self.peek().ok_or_else(|| self.error("unterminated escape"))?;
                    self.pos += 1;
                    out.push(escaped);
                }
                b if b == quote => {
                    return String::from_utf8(out).map_err(|_| self.error("string is not utf-8"));
                }
                b => out.push(b),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn parse_sequence(&mut self, open: u8, close: u8) -> Result<Vec<Literal>, NpyError> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b) if b == close => {}
                _ => return Err(self.error("expected ',' or end of sequence")),
            }
        }
    }

    fn parse_int(&mut self) -> Result<u64, NpyError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = std::str::from_utf8(&self.src[start..self.pos])
            .map_err(|_| self.error("invalid integer"))?;
        let value = digits
            .parse::<u64>()
            .map_err(|e| self.error(&format!("invalid integer '{}': {}", digits, e)))?;
        // Python 2 long suffix
        if self.peek() == Some(b'L') {
            self.pos += 1;
        }
        Ok(value)
    }

    fn parse_ident(&mut self) -> Result<Literal, NpyError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        match &self.src[start..self.pos] {
            b"True" => Ok(Literal::Bool(true)),
            b"False" => Ok(Literal::Bool(false)),
            other => Err(NpyError::InvalidHeader(format!(
                "unknown identifier '{}'",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

/// Encode an array header the way numpy does (version 1.0, padded to 64 bytes)
///
/// Used by tests and benchmarks to build fixtures.
pub fn encode_header(descr: &str, fortran_order: bool, shape: &[u64]) -> Vec<u8> {
    let shape_text = match shape.len() {
        1 => format!("({},)", shape[0]),
        _ => {
            let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
            format!("({})", dims.join(", "))
        }
    };
    let mut dict = format!(
        "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}",
        descr,
        if fortran_order { "True" } else { "False" },
        shape_text
    );

    let preamble = NPY_MAGIC.len() + 2 + 2;
    let unpadded = preamble + dict.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    dict.push_str(&" ".repeat(padding));
    dict.push('\n');

    let mut out = Vec::with_capacity(preamble + dict.len());
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out
}
