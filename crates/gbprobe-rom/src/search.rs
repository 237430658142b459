use crate::RomError;

pub const CONTEXT_BYTES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub offset: usize,
    pub context_start: usize,
    pub context: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    pub pattern: Vec<u8>,
    pub hits: Vec<SearchHit>,
    pub limited: bool,
}

impl SearchResults {
    pub fn offsets(&self) -> Vec<usize> {
        self.hits.iter().map(|hit| hit.offset).collect()
    }
}

/// Parses hex such as `"CD 96 42"` or `"cd9642"`. Whitespace is ignored.
pub fn parse_hex_pattern(text: &str) -> Result<Vec<u8>, RomError> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() {
        return Err(RomError::EmptyPattern);
    }
    let invalid = |reason: String| RomError::InvalidPattern {
        pattern: text.to_string(),
        reason,
    };
    if digits.len() % 2 != 0 {
        return Err(invalid(format!("odd number of hex digits ({})", digits.len())));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            if !pair.iter().all(char::is_ascii_hexdigit) {
                return Err(invalid(format!("not a hex byte: {byte}")));
            }
            u8::from_str_radix(&byte, 16).map_err(|_| invalid(format!("not a hex byte: {byte}")))
        })
        .collect()
}

pub fn search(
    data: &[u8],
    pattern: &[u8],
    start: usize,
    max_results: usize,
) -> Result<SearchResults, RomError> {
    if pattern.is_empty() {
        return Err(RomError::EmptyPattern);
    }
    let haystack = data.get(start..).unwrap_or_default();
    let hits: Vec<SearchHit> = haystack
        .windows(pattern.len())
        .enumerate()
        .filter(|(_, window)| *window == pattern)
        .take(max_results)
        .map(|(index, _)| {
            let offset = start + index;
            let context_start = offset.saturating_sub(CONTEXT_BYTES);
            let context_end = (offset + pattern.len() + CONTEXT_BYTES).min(data.len());
            SearchHit {
                offset,
                context_start,
                context: data[context_start..context_end].to_vec(),
            }
        })
        .collect();

    Ok(SearchResults {
        pattern: pattern.to_vec(),
        limited: hits.len() >= max_results,
        hits,
    })
}
