//! Parsed form of an emitted trace line, for downstream consumers.

use mvtrace_error::{Result, TraceError};
use serde::{Deserialize, Serialize};

use crate::op::OpKind;

const OP_PREFIX: &str = "Op: ";
const TX_SEP: &str = "\t Tx: ";
const OBJ_SEP: &str = "\t Obj: ";
const VAL_SEP: &str = " \t wVal: ";

/// One trace line, decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub kind: OpKind,
    pub txn: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl TraceRecord {
    /// Decode one line in the emitted layout. A trailing newline is allowed.
    ///
    /// The value field runs to the end of the line and is unescaped
    /// (`\\`, `\n`, `\r`, `\t`), so values containing separators or line
    /// breaks still decode. A raw tab or carriage return in the value, or an
    /// unknown escape, is rejected.
    pub fn parse_line(line: &str) -> Result<Self> {
        let body = line.strip_suffix('\n').unwrap_or(line);
        let err = |detail: &str| TraceError::malformed_line(body, detail);

        let rest = body
            .strip_prefix(OP_PREFIX)
            .ok_or_else(|| err("missing 'Op: ' prefix"))?;
        let (kind_token, rest) = rest
            .split_once(TX_SEP)
            .ok_or_else(|| err("missing transaction field"))?;
        let kind = OpKind::from_token(kind_token).ok_or_else(|| err("unknown operation kind"))?;

        let (txn_token, rest) = match rest.split_once(OBJ_SEP) {
            Some((txn, rest)) => (txn, Some(rest)),
            None => (rest, None),
        };
        let txn = txn_token
            .parse::<u64>()
            .map_err(|_| err("transaction id is not an integer"))?;

        let (object, value) = match rest {
            None => (None, None),
            Some(rest) => {
                let (obj_token, value) = match rest.split_once(VAL_SEP) {
                    Some((obj, raw)) => (
                        obj,
                        Some(unescape_value(raw).ok_or_else(|| err("malformed value escape"))?),
                    ),
                    None => (rest, None),
                };
                let object = obj_token
                    .parse::<i64>()
                    .map_err(|_| err("object id is not an integer"))?;
                (Some(object), value)
            }
        };

        if kind.has_object() != object.is_some() {
            return Err(err("object field does not match operation kind"));
        }
        if value.is_some() && kind != OpKind::Write {
            return Err(err("only WRITE records carry a value"));
        }

        Ok(Self {
            kind,
            txn,
            object,
            value,
        })
    }
}

fn unescape_value(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(match chars.next()? {
                '\\' => '\\',
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                _ => return None,
            }),
            '\n' | '\r' | '\t' => return None,
            c => out.push(c),
        }
    }
    Some(out)
}
