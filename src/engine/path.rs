//! Explicit field paths into JSON body templates
//!
//! Paths address one value inside a nested body, in dotted or bracket form:
//! `invoice.line_items[0].product_id` and `invoice[line_items][0][product_id]`
//! are the same path. `items[]` appends when setting.

use std::fmt;

use serde_json::{Map, Value as JsonValue};
use winnow::combinator::{alt, preceded, repeat};
use winnow::prelude::*;
use winnow::token::take_while;
use winnow::ModalResult;

use crate::errors::ValidationError;

/// Maximum array index to prevent huge allocations from a typo
const MAX_ARRAY_INDEX: usize = 10000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathToken {
    Key(String),
    Index(usize),
    Append,
}

/// A parsed field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    tokens: Vec<PathToken>,
}

fn is_key_char(c: char) -> bool {
    c != '[' && c != ']' && c != '.'
}

/// Parse a bracketed token: [0], [], or [key]
fn bracketed(input: &mut &str) -> ModalResult<PathToken> {
    '['.parse_next(input)?;
    let content: &str = take_while(0.., |c: char| c != ']').parse_next(input)?;
    ']'.parse_next(input)?;

    if content.is_empty() {
        Ok(PathToken::Append)
    } else if let Ok(idx) = content.parse::<usize>() {
        Ok(PathToken::Index(idx))
    } else {
        Ok(PathToken::Key(content.to_string()))
    }
}

fn bare_key(input: &mut &str) -> ModalResult<PathToken> {
    let key: &str = take_while(1.., is_key_char).parse_next(input)?;
    Ok(PathToken::Key(key.to_string()))
}

fn dotted_key(input: &mut &str) -> ModalResult<PathToken> {
    preceded('.', bare_key).parse_next(input)
}

fn path_tokens(input: &mut &str) -> ModalResult<Vec<PathToken>> {
    let first = alt((bare_key, bracketed)).parse_next(input)?;
    let rest: Vec<PathToken> = repeat(0.., alt((dotted_key, bracketed))).parse_next(input)?;
    let mut tokens = Vec::with_capacity(rest.len() + 1);
    tokens.push(first);
    tokens.extend(rest);
    Ok(tokens)
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self, ValidationError> {
        let invalid = |message: String| ValidationError::InvalidFieldPath {
            path: path.to_string(),
            message,
        };

        let mut input = path.trim();
        let tokens = path_tokens(&mut input).map_err(|e| invalid(format!("invalid syntax: {}", e)))?;
        if !input.is_empty() {
            return Err(invalid(format!("unexpected trailing input '{}'", input)));
        }

        for token in &tokens {
            if let PathToken::Index(idx) = token {
                if *idx > MAX_ARRAY_INDEX {
                    return Err(invalid(format!(
                        "array index {} exceeds maximum allowed ({})",
                        idx, MAX_ARRAY_INDEX
                    )));
                }
            }
        }

        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[PathToken] {
        &self.tokens
    }

    /// Path of the element at `index` below this path
    pub fn child_index(&self, index: usize) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(PathToken::Index(index));
        Self { tokens }
    }

    /// Path of the member `key` below this path
    pub fn child_key(&self, key: &str) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(PathToken::Key(key.to_string()));
        Self { tokens }
    }

    pub fn get<'a>(&self, root: &'a JsonValue) -> Option<&'a JsonValue> {
        self.tokens.iter().try_fold(root, |current, token| match token {
            PathToken::Key(k) => current.as_object()?.get(k),
            PathToken::Index(i) => current.as_array()?.get(*i),
            PathToken::Append => None,
        })
    }

    pub fn get_mut<'a>(&self, root: &'a mut JsonValue) -> Option<&'a mut JsonValue> {
        self.tokens.iter().try_fold(root, |current, token| match token {
            PathToken::Key(k) => current.as_object_mut()?.get_mut(k),
            PathToken::Index(i) => current.as_array_mut()?.get_mut(*i),
            PathToken::Append => None,
        })
    }

    /// Store `value` at this path, creating intermediate containers as needed.
    ///
    /// Existing non-container values along the way are replaced.
    pub fn set(&self, root: &mut JsonValue, value: JsonValue) -> Result<(), ValidationError> {
        let Some((last, parents)) = self.tokens.split_last() else {
            return Ok(());
        };

        let mut current = root;
        for (pos, token) in parents.iter().enumerate() {
            let next_is_array = matches!(self.tokens[pos + 1], PathToken::Index(_) | PathToken::Append);
            current = descend(current, token, next_is_array);
        }

        match last {
            PathToken::Key(k) => {
                ensure_object(current).insert(k.clone(), value);
            }
            PathToken::Index(i) => {
                let arr = ensure_array(current);
                while arr.len() <= *i {
                    arr.push(JsonValue::Null);
                }
                arr[*i] = value;
            }
            PathToken::Append => ensure_array(current).push(value),
        }
        Ok(())
    }
}

fn ensure_object(value: &mut JsonValue) -> &mut Map<String, JsonValue> {
    if !value.is_object() {
        *value = JsonValue::Object(Map::new());
    }
    match value {
        JsonValue::Object(map) => map,
        _ => unreachable!("value was just made an object"),
    }
}

fn ensure_array(value: &mut JsonValue) -> &mut Vec<JsonValue> {
    if !value.is_array() {
        *value = JsonValue::Array(Vec::new());
    }
    match value {
        JsonValue::Array(arr) => arr,
        _ => unreachable!("value was just made an array"),
    }
}

fn empty_container(array: bool) -> JsonValue {
    if array {
        JsonValue::Array(Vec::new())
    } else {
        JsonValue::Object(Map::new())
    }
}

fn descend<'a>(current: &'a mut JsonValue, token: &PathToken, next_is_array: bool) -> &'a mut JsonValue {
    match token {
        PathToken::Key(k) => {
            let slot = ensure_object(current)
                .entry(k.clone())
                .or_insert_with(|| empty_container(next_is_array));
            if slot.is_null() {
                *slot = empty_container(next_is_array);
            }
            slot
        }
        PathToken::Index(i) => {
            let arr = ensure_array(current);
            while arr.len() <= *i {
                arr.push(JsonValue::Null);
            }
            let slot = &mut arr[*i];
            if slot.is_null() {
                *slot = empty_container(next_is_array);
            }
            slot
        }
        PathToken::Append => {
            let arr = ensure_array(current);
            arr.push(empty_container(next_is_array));
            let last = arr.len() - 1;
            &mut arr[last]
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            match token {
                PathToken::Key(k) if i == 0 => write!(f, "{}", k)?,
                PathToken::Key(k) => write!(f, ".{}", k)?,
                PathToken::Index(idx) => write!(f, "[{}]", idx)?,
                PathToken::Append => write!(f, "[]")?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for FieldPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dotted_and_bracket_forms_agree() {
        let dotted = FieldPath::parse("invoice.line_items[0].product_id").unwrap();
        let bracket = FieldPath::parse("invoice[line_items][0][product_id]").unwrap();
        assert_eq!(dotted, bracket);
        assert_eq!(
            dotted.tokens(),
            &[
                PathToken::Key("invoice".to_string()),
                PathToken::Key("line_items".to_string()),
                PathToken::Index(0),
                PathToken::Key("product_id".to_string()),
            ]
        );
        assert_eq!(bracket.to_string(), "invoice.line_items[0].product_id");
    }

    #[test]
    fn test_rejects_malformed_paths() {
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("invoice..reference").is_err());
        assert!(FieldPath::parse("invoice[line_items").is_err());
        assert!(FieldPath::parse("items[99999]").is_err());
    }

    #[test]
    fn test_get() {
        let body = json!({"invoice": {"line_items": [{"product_id": 7}]}});
        let path = FieldPath::parse("invoice.line_items[0].product_id").unwrap();
        assert_eq!(path.get(&body), Some(&json!(7)));
        assert!(FieldPath::parse("invoice.missing").unwrap().get(&body).is_none());
        assert!(FieldPath::parse("invoice.line_items[3]").unwrap().get(&body).is_none());
    }

    #[test]
    fn test_set_existing_and_new() {
        let mut body = json!({"contact": {"name": "x"}});
        FieldPath::parse("contact.name").unwrap().set(&mut body, json!("Acme")).unwrap();
        FieldPath::parse("contact.address.city").unwrap().set(&mut body, json!("Riyadh")).unwrap();
        assert_eq!(body, json!({"contact": {"name": "Acme", "address": {"city": "Riyadh"}}}));
    }

    #[test]
    fn test_set_array_index_and_append() {
        let mut body = json!({});
        FieldPath::parse("items[1].qty").unwrap().set(&mut body, json!(2)).unwrap();
        assert_eq!(body, json!({"items": [null, {"qty": 2}]}));

        FieldPath::parse("items[]").unwrap().set(&mut body, json!("x")).unwrap();
        assert_eq!(body["items"][2], json!("x"));
    }

    #[test]
    fn test_set_does_not_touch_siblings() {
        let mut body = json!({"invoice": {"reference": "A", "status": "Draft"}});
        FieldPath::parse("invoice.reference").unwrap().set(&mut body, json!("B")).unwrap();
        assert_eq!(body["invoice"]["status"], "Draft");
    }
}
