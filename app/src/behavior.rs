//! Behavior specifications for mocked commands and their normalized form.
//!
//! Callers describe what a mocked command should do with a [`BehaviorSpec`].
//! The shorthand forms (a bare string for the whole command, a bare string
//! for a single reaction, a single string as an argument key) are expanded
//! by [`normalize_behavior`] into a [`NormalizedBehavior`], the fully explicit
//! table that gets embedded into the generated script.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Text used for both stdout and stderr when a command is called with
/// arguments that have no configured reaction.
pub const NOT_MOCKED: &str = "These parameters are not mocked!";

/// What a mocked command prints and returns for one argument key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    pub stdout: String,
    pub stderr: String,
    pub returncode: i32,
}

impl Reaction {
    /// Print `text` to stdout and exit 0.
    pub fn stdout(text: impl Into<String>) -> Self {
        Reaction {
            stdout: text.into(),
            ..Reaction::default()
        }
    }

    /// The fallback used when a table has no wildcard entry.
    pub fn not_mocked() -> Self {
        Reaction {
            stdout: NOT_MOCKED.to_string(),
            stderr: NOT_MOCKED.to_string(),
            returncode: 1,
        }
    }
}

/// A reaction with any subset of its fields given. Missing fields default to
/// empty output and exit code 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialReaction {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub returncode: Option<i32>,
}

impl PartialReaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout(mut self, text: impl Into<String>) -> Self {
        self.stdout = Some(text.into());
        self
    }

    pub fn stderr(mut self, text: impl Into<String>) -> Self {
        self.stderr = Some(text.into());
        self
    }

    pub fn returncode(mut self, code: i32) -> Self {
        self.returncode = Some(code);
        self
    }

    /// Fill the missing fields with their defaults.
    pub fn complete(&self) -> Reaction {
        Reaction {
            stdout: self.stdout.clone().unwrap_or_default(),
            stderr: self.stderr.clone().unwrap_or_default(),
            returncode: self.returncode.unwrap_or(0),
        }
    }
}

impl From<Reaction> for PartialReaction {
    fn from(r: Reaction) -> Self {
        PartialReaction {
            stdout: Some(r.stdout),
            stderr: Some(r.stderr),
            returncode: Some(r.returncode),
        }
    }
}

/// A reaction as written by the caller: either just the stdout text or a
/// (possibly partial) record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ReactionSpec {
    Stdout(String),
    Partial(PartialReaction),
}

impl ReactionSpec {
    pub fn normalize(&self) -> Reaction {
        match self {
            ReactionSpec::Stdout(text) => Reaction::stdout(text.clone()),
            ReactionSpec::Partial(partial) => partial.complete(),
        }
    }
}

impl From<&str> for ReactionSpec {
    fn from(s: &str) -> Self {
        ReactionSpec::Stdout(s.to_string())
    }
}

impl From<String> for ReactionSpec {
    fn from(s: String) -> Self {
        ReactionSpec::Stdout(s)
    }
}

impl From<PartialReaction> for ReactionSpec {
    fn from(p: PartialReaction) -> Self {
        ReactionSpec::Partial(p)
    }
}

impl From<Reaction> for ReactionSpec {
    fn from(r: Reaction) -> Self {
        ReactionSpec::Partial(r.into())
    }
}

/// An argument key as written by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgsSpec {
    /// Matches when no other key does.
    Wildcard,
    /// Exactly one argument.
    Single(String),
    /// Exactly this argument list; empty means "called without arguments".
    Sequence(Vec<String>),
}

impl ArgsSpec {
    /// The key matching an invocation without arguments.
    pub fn none() -> Self {
        ArgsSpec::Sequence(Vec::new())
    }

    pub fn normalize(&self) -> ArgKey {
        match self {
            ArgsSpec::Wildcard => ArgKey::Wildcard,
            ArgsSpec::Single(arg) => ArgKey::Exact(vec![arg.clone()]),
            ArgsSpec::Sequence(args) => ArgKey::Exact(args.clone()),
        }
    }
}

impl From<()> for ArgsSpec {
    fn from(_: ()) -> Self {
        ArgsSpec::none()
    }
}

impl From<&str> for ArgsSpec {
    fn from(s: &str) -> Self {
        ArgsSpec::Single(s.to_string())
    }
}

impl From<String> for ArgsSpec {
    fn from(s: String) -> Self {
        ArgsSpec::Single(s)
    }
}

impl From<Vec<String>> for ArgsSpec {
    fn from(v: Vec<String>) -> Self {
        ArgsSpec::Sequence(v)
    }
}

impl From<Vec<&str>> for ArgsSpec {
    fn from(v: Vec<&str>) -> Self {
        ArgsSpec::Sequence(v.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for ArgsSpec {
    fn from(v: &[&str]) -> Self {
        ArgsSpec::Sequence(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ArgsSpec {
    fn from(v: [&str; N]) -> Self {
        ArgsSpec::Sequence(v.iter().map(|s| s.to_string()).collect())
    }
}

/// A normalized argument key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArgKey {
    Wildcard,
    Exact(Vec<String>),
}

/// How one command should behave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BehaviorSpec {
    /// Print this text to stdout and exit 0, whatever the arguments.
    Always(String),
    /// Per-argument reactions in insertion order. Later duplicates win.
    Table(Vec<(ArgsSpec, ReactionSpec)>),
}

impl BehaviorSpec {
    /// An empty table; every call falls through to the "not mocked" reaction
    /// until rules are added with [`BehaviorSpec::when`].
    pub fn table() -> Self {
        BehaviorSpec::Table(Vec::new())
    }

    /// Add a reaction for an exact argument key.
    ///
    /// Calling this on `Always(text)` turns it into a table whose wildcard
    /// prints `text`, which behaves the same.
    pub fn when(self, args: impl Into<ArgsSpec>, reaction: impl Into<ReactionSpec>) -> Self {
        let mut rules = match self {
            BehaviorSpec::Always(text) => vec![(ArgsSpec::Wildcard, ReactionSpec::Stdout(text))],
            BehaviorSpec::Table(rules) => rules,
        };
        rules.push((args.into(), reaction.into()));
        BehaviorSpec::Table(rules)
    }

    /// Set the reaction used when no exact key matches.
    pub fn otherwise(self, reaction: impl Into<ReactionSpec>) -> Self {
        self.when(ArgsSpec::Wildcard, reaction)
    }
}

impl From<&str> for BehaviorSpec {
    fn from(s: &str) -> Self {
        BehaviorSpec::Always(s.to_string())
    }
}

impl From<String> for BehaviorSpec {
    fn from(s: String) -> Self {
        BehaviorSpec::Always(s)
    }
}

impl From<NormalizedBehavior> for BehaviorSpec {
    fn from(normalized: NormalizedBehavior) -> Self {
        let mut rules: Vec<(ArgsSpec, ReactionSpec)> = normalized
            .exact
            .into_iter()
            .map(|(args, reaction)| (ArgsSpec::Sequence(args), reaction.into()))
            .collect();
        rules.push((ArgsSpec::Wildcard, normalized.wildcard.into()));
        BehaviorSpec::Table(rules)
    }
}

/// The fully expanded behavior table of one command.
///
/// The wildcard reaction is stored apart from the exact keys so that every
/// table has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBehavior {
    exact: BTreeMap<Vec<String>, Reaction>,
    wildcard: Reaction,
}

impl NormalizedBehavior {
    pub fn wildcard(&self) -> &Reaction {
        &self.wildcard
    }

    pub fn get(&self, key: &ArgKey) -> Option<&Reaction> {
        match key {
            ArgKey::Wildcard => Some(&self.wildcard),
            ArgKey::Exact(args) => self.exact.get(args),
        }
    }

    /// Exact keys in sorted order.
    pub fn exact(&self) -> impl Iterator<Item = (&[String], &Reaction)> {
        self.exact.iter().map(|(k, v)| (k.as_slice(), v))
    }

    /// Number of entries including the wildcard.
    pub fn len(&self) -> usize {
        self.exact.len() + 1
    }

    /// Pick the reaction for an invocation: an exact, order- and
    /// count-sensitive match, else the wildcard. The generated script
    /// applies the same rule.
    pub fn reaction_for<S: AsRef<str>>(&self, args: &[S]) -> &Reaction {
        let key: Vec<String> = args.iter().map(|a| a.as_ref().to_owned()).collect();
        self.exact.get(&key).unwrap_or(&self.wildcard)
    }
}

/// Expand a behavior spec into its normalized table.
pub fn normalize_behavior(spec: &BehaviorSpec) -> NormalizedBehavior {
    let rules = match spec {
        BehaviorSpec::Always(text) => {
            return NormalizedBehavior {
                exact: BTreeMap::new(),
                wildcard: Reaction::stdout(text.clone()),
            }
        }
        BehaviorSpec::Table(rules) => rules,
    };

    let mut exact = BTreeMap::new();
    let mut wildcard = None;
    for (args, reaction) in rules {
        let reaction = reaction.normalize();
        match args.normalize() {
            ArgKey::Wildcard => wildcard = Some(reaction),
            ArgKey::Exact(key) => {
                exact.insert(key, reaction);
            }
        }
    }

    NormalizedBehavior {
        exact,
        wildcard: wildcard.unwrap_or_else(Reaction::not_mocked),
    }
}

/// Command names mapped to their behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockSpec {
    commands: BTreeMap<String, BehaviorSpec>,
}

impl MockSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MockSpec::insert`].
    pub fn command(mut self, name: impl Into<String>, behavior: impl Into<BehaviorSpec>) -> Self {
        self.insert(name, behavior);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, behavior: impl Into<BehaviorSpec>) {
        self.commands.insert(name.into(), behavior.into());
    }

    pub fn get(&self, name: &str) -> Option<&BehaviorSpec> {
        self.commands.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BehaviorSpec)> {
        self.commands.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for MockSpec
where
    K: Into<String>,
    V: Into<BehaviorSpec>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut spec = MockSpec::new();
        for (name, behavior) in iter {
            spec.insert(name, behavior);
        }
        spec
    }
}
