//! Scope list helpers used by both registry strategies.

// std
use std::slice::Iter;
// self
use crate::_prelude::*;

/// Ordered, deduplicated list of OAuth scopes.
///
/// Unlike a sorted set, the list keeps first-seen order so the merged scope string the host
/// receives is stable and mirrors the operator's configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeList(Vec<String>);
impl ScopeList {
	/// Tokenizes every source string on whitespace and keeps the first occurrence of each scope.
	pub fn merge<'a, I>(sources: I) -> Self
	where
		I: IntoIterator<Item = &'a str>,
	{
		let mut seen = HashSet::new();
		let mut scopes = Vec::new();

		for token in sources.into_iter().flat_map(str::split_whitespace) {
			if seen.insert(token) {
				scopes.push(token.to_owned());
			}
		}

		Self(scopes)
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the list contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.iter().any(|candidate| candidate == scope)
	}

	/// Iterator over scopes in first-seen order.
	pub fn iter(&self) -> Iter<'_, String> {
		self.0.iter()
	}

	/// Returns the space-delimited representation handed to the host.
	pub fn normalized(&self) -> String {
		self.0.join(" ")
	}
}
impl Display for ScopeList {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl FromStr for ScopeList {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::merge([s]))
	}
}
impl<'a> IntoIterator for &'a ScopeList {
	type IntoIter = Iter<'a, String>;
	type Item = &'a String;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}
