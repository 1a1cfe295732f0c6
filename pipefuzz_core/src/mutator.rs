use rand::Rng;
use serde::Serialize;
use std::fmt;

/// Default upper bound (inclusive) on the length of a run inserted by
/// [`MutatorKind::InsertRandomString`].
pub const DEFAULT_MAX_RANDOM_STRING_LEN: usize = 20;

/// Tokens inserted by [`MutatorKind::InsertBracket`].
pub const BRACKET_TOKENS: [&str; 3] = ["<", ">", "/>"];

/// Markup fragments inserted by [`MutatorKind::InsertHtmlFragment`].
pub const HTML_FRAGMENTS: [&str; 6] = [
    "<html>",
    "</html>",
    "<div>",
    "</div>",
    "<script>",
    "</script>",
];

/// Code points produced by the random string mutator are drawn from `0..ASCII_BOUND`.
const ASCII_BOUND: u8 = 128;

/// A single concrete edit of a text payload.
///
/// Positions are counted in characters, not bytes, so a mutation chosen for one
/// string can be described and replayed independently of its encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Mutation {
    /// Insert `text` before the character at `position` (or at the end).
    Insert { position: usize, text: String },
    /// Remove the character at `position`.
    Delete { position: usize },
}

impl Mutation {
    /// Applies the edit to `input`, returning the mutated copy.
    ///
    /// Applying never fails: an insert past the end appends, and a delete
    /// outside the string leaves it unchanged.
    pub fn apply(&self, input: &str) -> String {
        match self {
            Mutation::Insert { position, text } => {
                let offset = byte_offset(input, *position);
                let mut output = String::with_capacity(input.len() + text.len());
                output.push_str(&input[..offset]);
                output.push_str(text);
                output.push_str(&input[offset..]);
                output
            }
            Mutation::Delete { position } => match input.char_indices().nth(*position) {
                Some((offset, ch)) => {
                    let mut output = String::with_capacity(input.len());
                    output.push_str(&input[..offset]);
                    output.push_str(&input[offset + ch.len_utf8()..]);
                    output
                }
                None => input.to_string(),
            },
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Insert { position, text } => write!(f, "insert {text:?} at {position}"),
            Mutation::Delete { position } => write!(f, "delete at {position}"),
        }
    }
}

fn byte_offset(input: &str, char_position: usize) -> usize {
    input
        .char_indices()
        .nth(char_position)
        .map_or(input.len(), |(offset, _)| offset)
}

/// Uniform insertion point in `[0, len]`, where `len` is the character count.
fn random_position<R: Rng + ?Sized>(input: &str, rng: &mut R) -> usize {
    rng.random_range(0..=input.chars().count())
}

/// A `Mutator` derives one new payload from an existing one.
///
/// Mutation is split in two steps: [`Mutator::choose`] consumes randomness and
/// decides on a concrete [`Mutation`], and [`Mutation::apply`] performs it.
/// Every mutator is total: it must accept any input, including the empty string.
///
/// # Type Parameters
/// * `R`: The type of random number generator used for mutation decisions.
pub trait Mutator<R: Rng + ?Sized> {
    /// Short stable name, used in logs and reports.
    fn name(&self) -> &'static str;

    /// Picks the edit this mutator would make to `input`.
    ///
    /// Returns `None` when the mutator has nothing to do (deleting from an
    /// empty string), in which case the input is passed through unchanged.
    fn choose(&self, input: &str, rng: &mut R) -> Option<Mutation>;

    /// Chooses and applies a mutation in one go.
    fn mutate(&self, input: &str, rng: &mut R) -> String {
        match self.choose(input, rng) {
            Some(mutation) => mutation.apply(input),
            None => input.to_string(),
        }
    }
}

/// The closed set of mutation strategies.
///
/// Adding a strategy means adding a variant here and an arm in
/// [`MutatorKind::choose`]; the scheduler and harness are unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutatorKind {
    /// Insert one of `<`, `>` or `/>` at a random position.
    InsertBracket,
    /// Remove one random character; identity on the empty string.
    DeleteCharacter,
    /// Insert `1..=max_len` random code points from `0..128` at a random position.
    InsertRandomString { max_len: usize },
    /// Insert one of [`HTML_FRAGMENTS`] at a random position.
    InsertHtmlFragment,
}

impl MutatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            MutatorKind::InsertBracket => "insert-bracket",
            MutatorKind::DeleteCharacter => "delete-character",
            MutatorKind::InsertRandomString { .. } => "insert-random-string",
            MutatorKind::InsertHtmlFragment => "insert-html-fragment",
        }
    }
}

impl<R: Rng + ?Sized> Mutator<R> for MutatorKind {
    fn name(&self) -> &'static str {
        MutatorKind::name(self)
    }

    fn choose(&self, input: &str, rng: &mut R) -> Option<Mutation> {
        match self {
            MutatorKind::InsertBracket => {
                let position = random_position(input, rng);
                let token = BRACKET_TOKENS[rng.random_range(0..BRACKET_TOKENS.len())];
                Some(Mutation::Insert {
                    position,
                    text: token.to_string(),
                })
            }
            MutatorKind::DeleteCharacter => {
                let char_count = input.chars().count();
                if char_count == 0 {
                    return None;
                }
                Some(Mutation::Delete {
                    position: rng.random_range(0..char_count),
                })
            }
            MutatorKind::InsertRandomString { max_len } => {
                let length = rng.random_range(1..=(*max_len).max(1));
                let position = random_position(input, rng);
                let text: String = (0..length)
                    .map(|_| char::from(rng.random_range(0..ASCII_BOUND)))
                    .collect();
                Some(Mutation::Insert { position, text })
            }
            MutatorKind::InsertHtmlFragment => {
                let position = random_position(input, rng);
                let fragment = HTML_FRAGMENTS[rng.random_range(0..HTML_FRAGMENTS.len())];
                Some(Mutation::Insert {
                    position,
                    text: fragment.to_string(),
                })
            }
        }
    }
}

impl fmt::Display for MutatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered, fixed list of mutators the scheduler draws from.
///
/// Order only matters for which index selects which mutator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutatorCatalog {
    mutators: Vec<MutatorKind>,
}

impl MutatorCatalog {
    pub fn new(mutators: Vec<MutatorKind>) -> Self {
        Self { mutators }
    }

    /// The stock catalog: bracket insertion, character deletion and random
    /// string insertion, plus HTML fragment insertion when `html_fragments` is set.
    pub fn standard(max_random_string_len: usize, html_fragments: bool) -> Self {
        let mut mutators = vec![
            MutatorKind::InsertBracket,
            MutatorKind::DeleteCharacter,
            MutatorKind::InsertRandomString {
                max_len: max_random_string_len,
            },
        ];
        if html_fragments {
            mutators.push(MutatorKind::InsertHtmlFragment);
        }
        Self { mutators }
    }

    pub fn push(&mut self, mutator: MutatorKind) {
        self.mutators.push(mutator);
    }

    pub fn get(&self, index: usize) -> Option<&MutatorKind> {
        self.mutators.get(index)
    }

    pub fn len(&self) -> usize {
        self.mutators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MutatorKind> {
        self.mutators.iter()
    }
}

impl Default for MutatorCatalog {
    fn default() -> Self {
        Self::standard(DEFAULT_MAX_RANDOM_STRING_LEN, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;

    const ALL_KINDS: [MutatorKind; 4] = [
        MutatorKind::InsertBracket,
        MutatorKind::DeleteCharacter,
        MutatorKind::InsertRandomString { max_len: 20 },
        MutatorKind::InsertHtmlFragment,
    ];

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    #[test]
    fn every_mutator_accepts_empty_input() {
        let mut rng = ChaCha8Rng::from_seed([0u8; 32]);
        for kind in ALL_KINDS {
            for _ in 0..100 {
                let output = kind.mutate("", &mut rng);
                if kind == MutatorKind::DeleteCharacter {
                    assert_eq!(output, "", "Delete on empty input must be the identity");
                } else {
                    assert!(!output.is_empty(), "{kind} should insert into empty input");
                }
            }
        }
    }

    #[test]
    fn insert_bracket_adds_exactly_one_token() {
        let mut rng = ChaCha8Rng::from_seed([1u8; 32]);
        let seed = "<p>hello</p>";
        for _ in 0..200 {
            let mutation = MutatorKind::InsertBracket
                .choose(seed, &mut rng)
                .expect("Insert always yields a mutation");
            match &mutation {
                Mutation::Insert { position, text } => {
                    assert!(*position <= char_len(seed));
                    assert!(BRACKET_TOKENS.contains(&text.as_str()), "Unexpected token {text:?}");
                    let output = mutation.apply(seed);
                    assert_eq!(char_len(&output), char_len(seed) + char_len(text));
                }
                other => panic!("Expected an insert, got {other:?}"),
            }
        }
    }

    #[test]
    fn insert_bracket_reaches_both_ends() {
        let mut rng = ChaCha8Rng::from_seed([2u8; 32]);
        let seed = "ab";
        let mut positions = std::collections::HashSet::new();
        for _ in 0..300 {
            if let Some(Mutation::Insert { position, .. }) =
                MutatorKind::InsertBracket.choose(seed, &mut rng)
            {
                positions.insert(position);
            }
        }
        assert_eq!(positions.len(), 3, "Positions 0, 1 and 2 should all occur: {positions:?}");
    }

    #[test]
    fn delete_character_removes_one_char() {
        let mut rng = ChaCha8Rng::from_seed([3u8; 32]);
        let seed = "héllo wörld";
        for _ in 0..200 {
            let output = MutatorKind::DeleteCharacter.mutate(seed, &mut rng);
            assert_eq!(char_len(&output), char_len(seed) - 1);
        }
    }

    #[test]
    fn insert_random_string_respects_length_and_ascii_bounds() {
        let mut rng = ChaCha8Rng::from_seed([4u8; 32]);
        let kind = MutatorKind::InsertRandomString { max_len: 5 };
        let mut seen_lengths = std::collections::HashSet::new();
        for _ in 0..500 {
            match kind.choose("seed", &mut rng) {
                Some(Mutation::Insert { position, text }) => {
                    assert!(position <= 4);
                    let len = char_len(&text);
                    assert!((1..=5).contains(&len), "Run length {len} out of range");
                    assert!(text.chars().all(|c| (c as u32) < 128));
                    seen_lengths.insert(len);
                }
                other => panic!("Expected an insert, got {other:?}"),
            }
        }
        assert_eq!(seen_lengths.len(), 5);
    }

    #[test]
    fn insert_random_string_with_zero_bound_still_inserts() {
        let mut rng = ChaCha8Rng::from_seed([5u8; 32]);
        let output = MutatorKind::InsertRandomString { max_len: 0 }.mutate("x", &mut rng);
        assert_eq!(char_len(&output), 2);
    }

    #[test]
    fn insert_html_fragment_uses_known_fragments() {
        let mut rng = ChaCha8Rng::from_seed([6u8; 32]);
        for _ in 0..100 {
            match MutatorKind::InsertHtmlFragment.choose("<body/>", &mut rng) {
                Some(Mutation::Insert { text, .. }) => {
                    assert!(HTML_FRAGMENTS.contains(&text.as_str()));
                }
                other => panic!("Expected an insert, got {other:?}"),
            }
        }
    }

    #[test]
    fn apply_reproduces_hand_written_edits() {
        let seed = "<a>";
        let insert_lt = Mutation::Insert {
            position: 0,
            text: "<".to_string(),
        };
        let delete_first = Mutation::Delete { position: 0 };
        let insert_gt = Mutation::Insert {
            position: 1,
            text: ">".to_string(),
        };
        assert_eq!(insert_lt.apply(seed), "<<a>");
        assert_eq!(delete_first.apply(seed), "a>");
        assert_eq!(insert_gt.apply(seed), "<>a>");
    }

    #[test]
    fn apply_is_total_for_out_of_range_positions() {
        let append = Mutation::Insert {
            position: 99,
            text: "!".to_string(),
        };
        assert_eq!(append.apply("ab"), "ab!");
        assert_eq!(Mutation::Delete { position: 7 }.apply("ab"), "ab");
        assert_eq!(Mutation::Delete { position: 0 }.apply(""), "");
    }

    #[test]
    fn apply_counts_positions_in_characters() {
        let mutation = Mutation::Insert {
            position: 1,
            text: "<".to_string(),
        };
        assert_eq!(mutation.apply("éa"), "é<a");
        assert_eq!(Mutation::Delete { position: 1 }.apply("aéb"), "ab");
    }

    #[test]
    fn same_seed_same_mutation() {
        let mut rng_a = ChaCha8Rng::from_seed([7u8; 32]);
        let mut rng_b = ChaCha8Rng::from_seed([7u8; 32]);
        for kind in ALL_KINDS {
            assert_eq!(kind.choose("<a>", &mut rng_a), kind.choose("<a>", &mut rng_b));
        }
    }

    #[test]
    fn standard_catalog_contents() {
        let with_html = MutatorCatalog::standard(100, true);
        assert_eq!(with_html.len(), 4);
        assert_eq!(
            with_html.get(2),
            Some(&MutatorKind::InsertRandomString { max_len: 100 })
        );
        let without_html = MutatorCatalog::standard(20, false);
        assert_eq!(without_html.len(), 3);
        assert!(without_html.iter().all(|k| *k != MutatorKind::InsertHtmlFragment));
        assert_eq!(MutatorCatalog::default(), MutatorCatalog::standard(20, true));
    }

    #[test]
    fn mutator_display_uses_name() {
        assert_eq!(MutatorKind::DeleteCharacter.to_string(), "delete-character");
        let mutation = Mutation::Insert {
            position: 2,
            text: "/>".to_string(),
        };
        assert_eq!(mutation.to_string(), "insert \"/>\" at 2");
    }
}
