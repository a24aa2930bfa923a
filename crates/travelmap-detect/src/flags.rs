//! Splits text into flag-emoji tokens without breaking multi-codepoint sequences.

const REGIONAL_INDICATOR_A: char = '\u{1F1E6}';
const REGIONAL_INDICATOR_Z: char = '\u{1F1FF}';
const BLACK_FLAG: char = '\u{1F3F4}';
const TAG_FIRST: char = '\u{E0020}';
const TAG_LAST: char = '\u{E007E}';
const CANCEL_TAG: char = '\u{E007F}';

fn is_regional_indicator(c: char) -> bool {
    (REGIONAL_INDICATOR_A..=REGIONAL_INDICATOR_Z).contains(&c)
}

fn is_tag(c: char) -> bool {
    (TAG_FIRST..=TAG_LAST).contains(&c)
}

/// Returns every flag token in `text`, left to right.
///
/// Regional indicators pair greedily from the left, so in "🇯🇵🇰🇷" the inner
/// "🇵🇰" is never reported. Subdivision flags (black flag + tag characters +
/// cancel tag) come back as one token.
pub(crate) fn flag_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut iter = text.char_indices().peekable();

    while let Some((start, c)) = iter.next() {
        if is_regional_indicator(c) {
            if let Some(&(next_idx, next)) = iter.peek() {
                if is_regional_indicator(next) {
                    iter.next();
                    tokens.push(&text[start..next_idx + next.len_utf8()]);
                }
            }
        } else if c == BLACK_FLAG {
            let mut end = None;
            let mut tags = 0usize;
            while let Some(&(idx, next)) = iter.peek() {
                if is_tag(next) {
                    iter.next();
                    tags += 1;
                } else {
                    if next == CANCEL_TAG && tags > 0 {
                        iter.next();
                        end = Some(idx + next.len_utf8());
                    }
                    break;
                }
            }
            if let Some(end) = end {
                tokens.push(&text[start..end]);
            }
        }
    }

    tokens
}

/// Whether `token` is one complete flag sequence.
pub(crate) fn is_flag_token(token: &str) -> bool {
    let tokens = flag_tokens(token);
    tokens.len() == 1 && tokens[0].len() == token.len()
}
