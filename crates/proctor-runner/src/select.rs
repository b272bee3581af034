use proctor_core::TestCase;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("unterminated character class")]
    UnterminatedClass,
    #[error("empty character class")]
    EmptyClass,
    #[error("unexpected {0:?} in character class")]
    BadClassChar(char),
    #[error("trailing escape")]
    TrailingEscape,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Literal(char),
    /// `?`: one character other than `/`.
    One,
    /// `*`: any run of characters other than `/`.
    Star,
    Class { negated: bool, ranges: Vec<(char, char)> },
}

/// Shell-style name pattern: `*`, `?`, `[a-z]`, `[^0-9]` and `\` escapes.
/// The whole name has to match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    tokens: Vec<Token>,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let mut tokens = Vec::new();
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            let token = match c {
                '*' => {
                    // Adjacent stars behave like one.
                    if tokens.last() == Some(&Token::Star) {
                        continue;
                    }
                    Token::Star
                }
                '?' => Token::One,
                '\\' => Token::Literal(chars.next().ok_or(PatternError::TrailingEscape)?),
                '[' => {
                    let negated = chars.next_if(|c| *c == '^' || *c == '!').is_some();
                    let mut ranges = Vec::new();
                    loop {
                        match chars.peek() {
                            None => return Err(PatternError::UnterminatedClass),
                            Some(']') if !ranges.is_empty() => {
                                chars.next();
                                break;
                            }
                            Some(']') => return Err(PatternError::EmptyClass),
                            Some(_) => {}
                        }
                        let lo = class_char(&mut chars)?;
                        let hi = if chars.next_if_eq(&'-').is_some() {
                            class_char(&mut chars)?
                        } else {
                            lo
                        };
                        ranges.push((lo, hi));
                    }
                    Token::Class { negated, ranges }
                }
                c => Token::Literal(c),
            };
            tokens.push(token);
        }
        Ok(Self { tokens })
    }

    pub fn matches(&self, name: &str) -> bool {
        let name: Vec<char> = name.chars().collect();
        match_tokens(&self.tokens, &name)
    }
}

fn class_char(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<char, PatternError> {
    match chars.next() {
        None => Err(PatternError::UnterminatedClass),
        Some('\\') => chars.next().ok_or(PatternError::UnterminatedClass),
        Some(c @ ('-' | ']')) => Err(PatternError::BadClassChar(c)),
        Some(c) => Ok(c),
    }
}

fn match_tokens(tokens: &[Token], name: &[char]) -> bool {
    let Some((token, rest)) = tokens.split_first() else {
        return name.is_empty();
    };
    if *token == Token::Star {
        for i in 0..=name.len() {
            if match_tokens(rest, &name[i..]) {
                return true;
            }
            if name.get(i) == Some(&'/') {
                break;
            }
        }
        return false;
    }
    match name.split_first() {
        Some((c, tail)) if accepts(token, *c) => match_tokens(rest, tail),
        _ => false,
    }
}

fn accepts(token: &Token, c: char) -> bool {
    match token {
        Token::Literal(l) => *l == c,
        Token::One => c != '/',
        Token::Star => false,
        Token::Class { negated, ranges } => {
            let hit = ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&c));
            hit != *negated
        }
    }
}

/// Decides which test cases of a run are eligible.
#[derive(Clone, Debug)]
pub struct Selector {
    name: NameFilter,
    tags: Vec<String>,
}

#[derive(Clone, Debug)]
enum NameFilter {
    Any,
    Glob(Pattern),
    /// Bad pattern: nothing is eligible.
    Invalid,
}

impl Selector {
    pub fn new(filter: Option<&str>, tags: &[String]) -> Self {
        let name = match filter.filter(|f| !f.is_empty()) {
            None => NameFilter::Any,
            Some(f) => match Pattern::new(f) {
                Ok(p) => NameFilter::Glob(p),
                Err(_) => NameFilter::Invalid,
            },
        };
        Self {
            name,
            tags: tags.iter().filter(|t| !t.is_empty()).cloned().collect(),
        }
    }

    pub fn matches(&self, tc: &TestCase) -> bool {
        let name_ok = match &self.name {
            NameFilter::Any => true,
            NameFilter::Glob(p) => p.matches(&tc.name),
            NameFilter::Invalid => false,
        };
        name_ok && (self.tags.is_empty() || self.tags.iter().any(|t| tc.has_tag(t)))
    }
}
