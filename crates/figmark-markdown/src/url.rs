//! Link destination normalization.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left untouched in link destinations; `%` is handled separately
/// so that existing escapes survive.
const LINK_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#')
    .remove(b'%');

/// Percent-encode unsafe characters of a link destination.
///
/// Existing `%XX` escapes are preserved; a lone `%` becomes `%25`.
pub(crate) fn normalize_link(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut rest = url;
    while let Some(pos) = rest.find('%') {
        out.extend(utf8_percent_encode(&rest[..pos], LINK_ENCODE_SET));
        let escape = rest.as_bytes().get(pos + 1..pos + 3);
        if escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            out.push_str(&rest[pos..pos + 3]);
            rest = &rest[pos + 3..];
        } else {
            out.push_str("%25");
            rest = &rest[pos + 1..];
        }
    }
    out.extend(utf8_percent_encode(rest, LINK_ENCODE_SET));
    out
}
