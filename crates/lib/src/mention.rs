//! Remove the first `@mention` from a message before it is forwarded as a question.

use crate::channels::Entity;

/// The mention span does not fit the text (past the end, or not on a char boundary).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("mention span {offset}+{length} out of bounds for text of {text_len} bytes")]
pub struct BoundsError {
    pub offset: usize,
    pub length: usize,
    pub text_len: usize,
}

/// Return `text` with the byte range of the first mention entity cut out.
/// Only the first mention in entity order is removed; without one the text is returned as is.
pub fn strip_first_mention(text: &str, entities: &[Entity]) -> Result<String, BoundsError> {
    let Some(entity) = entities.iter().find(|e| e.is_mention()) else {
        return Ok(text.to_string());
    };
    let end = entity.offset.checked_add(entity.length);
    match end {
        Some(end) if text.get(entity.offset..end).is_some() => {
            let mut out = String::with_capacity(text.len() - entity.length);
            out.push_str(&text[..entity.offset]);
            out.push_str(&text[end..]);
            Ok(out)
        }
        _ => Err(BoundsError {
            offset: entity.offset,
            length: entity.length,
            text_len: text.len(),
        }),
    }
}
