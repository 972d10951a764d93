//! Turns lyric text and recognizer words into comparable forms.
//!
//! Every word gets two derived forms: `normalized` (lower-cased, diacritics
//! folded, punctuation removed) and `phonetic` (normalized with acoustically
//! confusable letters merged and repeated letters collapsed).

use std::collections::HashMap;

/// Cached forms are dropped once the cache grows past this many words.
const NORMALIZER_CACHE_CAPACITY: usize = 4096;

/// Punctuation removed from inside and around words.
const PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '\'', '"', '(', ')', '[', ']', '{', '}', '…', '–', '—', '-',
    '’', '‘', '“', '”',
];

/// One unit of the reference lyric sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub index: u32,
    /// The word as it appeared in the lyric text.
    pub raw: String,
    pub normalized: String,
    pub phonetic: String,
}

/// Derived forms of a single word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordForms {
    pub normalized: String,
    pub phonetic: String,
}

impl WordForms {
    pub fn of(word: &str) -> Self {
        let normalized = normalize(word);
        let phonetic = phonetic(&normalized);
        Self {
            normalized,
            phonetic,
        }
    }
}

impl From<&Token> for WordForms {
    fn from(token: &Token) -> Self {
        Self {
            normalized: token.normalized.clone(),
            phonetic: token.phonetic.clone(),
        }
    }
}

/// Splits `text` into dense, normalized reference tokens.
///
/// Words that are empty after stripping punctuation are dropped and the
/// remaining tokens are numbered from zero without gaps.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for raw in text.split_whitespace() {
        let forms = WordForms::of(raw);
        if forms.normalized.is_empty() {
            continue;
        }

        tokens.push(Token {
            index: tokens.len() as u32,
            raw: raw.to_string(),
            normalized: forms.normalized,
            phonetic: forms.phonetic,
        });
    }

    tokens
}

/// Lower-cases `word`, folds diacritics and drops everything that is not a
/// letter or a digit.
pub fn normalize(word: &str) -> String {
    let mut normalized = String::with_capacity(word.len());
    for c in word.trim().chars() {
        if PUNCTUATION.contains(&c) || is_combining_mark(c) {
            continue;
        }

        // handle the dotted and dotless capital I before the generic lowering
        // turns 'İ' into "i̇"
        let folded = match c {
            'I' | 'İ' | 'ı' => Some('i'),
            _ => None,
        };

        match folded {
            Some(c) => normalized.push(c),
            None => {
                for lower in c.to_lowercase() {
                    let lower = fold_diacritic(lower);
                    if lower.is_alphanumeric() && !is_combining_mark(lower) {
                        normalized.push(lower);
                    }
                }
            }
        }
    }

    normalized
}

/// Merges confusable letter classes of an already normalized word and
/// collapses runs of the same letter.
pub fn phonetic(normalized: &str) -> String {
    let mut output = String::with_capacity(normalized.len());
    let mut previous = None;
    for c in normalized.chars() {
        let class = phonetic_class(c);
        if previous == Some(class) {
            continue;
        }

        output.push(class);
        previous = Some(class);
    }

    output
}

fn fold_diacritic(c: char) -> char {
    match c {
        'ç' | 'ć' | 'č' => 'c',
        'ğ' => 'g',
        'ı' | 'î' | 'í' | 'ì' | 'ï' => 'i',
        'ö' | 'ô' | 'ó' | 'ò' | 'õ' => 'o',
        'ş' | 'ś' | 'š' => 's',
        'ü' | 'û' | 'ú' | 'ù' => 'u',
        'â' | 'á' | 'à' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'ñ' => 'n',
        'ž' | 'ź' | 'ż' => 'z',
        other => other,
    }
}

fn phonetic_class(c: char) -> char {
    match c {
        'c' | 'j' => 'c',
        's' | 'z' => 's',
        'k' | 'g' | 'q' => 'k',
        't' | 'd' => 't',
        'p' | 'b' => 'p',
        'f' | 'v' | 'w' => 'f',
        'e' | 'i' => 'i',
        'o' | 'u' => 'o',
        other => other,
    }
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

/// Memoizes [`WordForms`] per raw recognizer word.
///
/// Recognizers repeat the same interim words many times while a word is
/// being sung, so the forms are computed once and looked up afterwards.
#[derive(Debug, Default)]
pub struct Normalizer {
    cache: HashMap<String, WordForms>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached forms of `word`, computing them on first use.
    pub fn forms(&mut self, word: &str) -> &WordForms {
        if !self.cache.contains_key(word) {
            if self.cache.len() >= NORMALIZER_CACHE_CAPACITY {
                log::debug!("Normalizer cache reached {} words, clearing it", self.cache.len());
                self.cache.clear();
            }
            self.cache.insert(word.to_string(), WordForms::of(word));
        }

        &self.cache[word]
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_case() {
        assert_eq!(normalize("Merhaba,"), "merhaba");
        assert_eq!(normalize("(Gel!)"), "gel");
        assert_eq!(normalize("don't"), "dont");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn folds_turkish_diacritics() {
        assert_eq!(normalize("Çiçeğim"), "cicegim");
        assert_eq!(normalize("IŞIK"), "isik");
        assert_eq!(normalize("İstanbul"), "istanbul");
        assert_eq!(normalize("gönül"), "gonul");
        assert_eq!(normalize("doğru"), "dogru");
    }

    #[test]
    fn phonetic_merges_confusable_letters() {
        assert_eq!(phonetic("gel"), phonetic("kel"));
        assert_eq!(phonetic("bana"), phonetic("pana"));
        assert_eq!(phonetic("dogru"), phonetic("tokru"));
        assert_eq!(phonetic("gelmek"), phonetic("kelmek"));
    }

    #[test]
    fn phonetic_collapses_repeated_letters() {
        assert_eq!(phonetic("allah"), "alah");
        assert_eq!(phonetic("kkk"), "k");
        // merged classes collapse too: 'd' and 't' are the same sound
        assert_eq!(phonetic("adt"), "at");
    }

    #[test]
    fn tokenize_drops_empty_words_and_reindexes() {
        let tokens = tokenize("Gel  - bana, ... doğru!");
        let normalized: Vec<&str> = tokens.iter().map(|t| t.normalized.as_str()).collect();
        assert_eq!(normalized, vec!["gel", "bana", "dogru"]);

        let indices: Vec<u32> = tokens.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(tokens[2].raw, "doğru!");
    }

    #[test]
    fn tokenize_empty_text() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ... !!  ").is_empty());
    }

    #[test]
    fn normalizer_caches_forms() {
        let mut normalizer = Normalizer::new();
        assert_eq!(normalizer.forms("Doğru").normalized, "dogru");
        assert_eq!(normalizer.forms("Doğru").phonetic, phonetic("dogru"));
        assert_eq!(normalizer.len(), 1);
    }
}
