// Copyright 2026 Sphinx Client Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Characters with a meaning in the extended query syntax.
const SPECIAL: &[char] = &[
    '(', ')', '|', '-', '!', '@', '~', '"', '&', '/', '\\', '^', '$', '=', '<',
];

/// Backslash-escapes query syntax characters so `text` matches literally.
pub fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_operators() {
        assert_eq!(escape_string("foo (bar) | baz!"), r"foo \(bar\) \| baz\!");
        assert_eq!(escape_string(r#"a-b@c~"d"&e/f\g^h$i=j<k"#), r#"a\-b\@c\~\"d\"\&e\/f\\g\^h\$i\=j\<k"#);
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(escape_string(""), "");
        assert_eq!(escape_string("plain words > 3 * x"), "plain words > 3 * x");
        assert_eq!(escape_string("ünïcode"), "ünïcode");
    }
}
