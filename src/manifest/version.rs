//! PEP 440 version syntax.

/// A parsed version, reduced to what the linter needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub epoch: u64,
    pub release: Vec<u64>,
    pub wildcard: bool,
}

struct Cursor<'a> {
    s: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.s.get(self.pos).copied()
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_separator(&mut self) -> bool {
        matches!(self.peek(), Some(b'.' | b'-' | b'_')) && {
            self.pos += 1;
            true
        }
    }

    /// Reads a run of digits. Values beyond `u64::MAX` saturate, since any
    /// length of digits is a valid segment.
    fn number(&mut self) -> Option<u64> {
        let start = self.pos;
        let mut value: u64 = 0;
        while let Some(d @ b'0'..=b'9') = self.peek() {
            value = value.saturating_mul(10).saturating_add(u64::from(d - b'0'));
            self.pos += 1;
        }
        (start != self.pos).then_some(value)
    }

    /// Consumes the longest of `words` found at the cursor.
    fn word(&mut self, words: &[&str]) -> bool {
        let rest = &self.s[self.pos..];
        let best = words
            .iter()
            .filter(|w| rest.starts_with(w.as_bytes()))
            .map(|w| w.len())
            .max();
        match best {
            Some(len) => {
                self.pos += len;
                true
            }
            None => false,
        }
    }

    fn done(&self) -> bool {
        self.pos == self.s.len()
    }
}

/// Parses a PEP 440 version. Pre, post and dev tags accept the spellings the
/// PEP normalises (`alpha`, `-1` for post, and so on). With `allow_wildcard`
/// a trailing `.*` after the release segment is accepted.
pub fn parse_version(input: &str, allow_wildcard: bool) -> Option<Version> {
    let lower = input.trim().to_ascii_lowercase();
    let mut c = Cursor {
        s: lower.as_bytes(),
        pos: 0,
    };

    c.eat(b'v');

    let first = c.number()?;
    let (epoch, mut release) = if c.eat(b'!') {
        (first, vec![c.number()?])
    } else {
        (0, vec![first])
    };

    loop {
        let save = c.pos;
        if !c.eat(b'.') {
            break;
        }
        match c.number() {
            Some(n) => release.push(n),
            None => {
                c.pos = save;
                break;
            }
        }
    }

    if allow_wildcard {
        let save = c.pos;
        if c.eat(b'.') && c.eat(b'*') {
            return c.done().then_some(Version {
                epoch,
                release,
                wildcard: true,
            });
        }
        c.pos = save;
    }

    // pre-release
    let save = c.pos;
    c.eat_separator();
    if c.word(&["alpha", "beta", "preview", "pre", "rc", "a", "b", "c"]) {
        c.eat_separator();
        c.number();
    } else {
        c.pos = save;
    }

    // post-release
    let save = c.pos;
    if c.eat(b'-') && c.number().is_some() {
        // implicit post: "1.0-1"
    } else {
        c.pos = save;
        c.eat_separator();
        if c.word(&["post", "rev", "r"]) {
            c.eat_separator();
            c.number();
        } else {
            c.pos = save;
        }
    }

    // dev release
    let save = c.pos;
    c.eat_separator();
    if c.word(&["dev"]) {
        c.eat_separator();
        c.number();
    } else {
        c.pos = save;
    }

    // local version label
    if c.eat(b'+') {
        loop {
            let start = c.pos;
            while matches!(c.peek(), Some(b'a'..=b'z' | b'0'..=b'9')) {
                c.pos += 1;
            }
            if start == c.pos {
                return None;
            }
            if !c.eat_separator() {
                break;
            }
        }
    }

    c.done().then_some(Version {
        epoch,
        release,
        wildcard: false,
    })
}
