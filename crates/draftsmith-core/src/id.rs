//! Entity identifiers and their allocation.
//!
//! Identifiers are opaque strings scoped to one draft document. Fresh ids are
//! uppercase hyphenated UUIDs, the form the external editor writes. Ids read
//! from a file are kept verbatim whatever their shape.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a draft entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for Identifier {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
enum Strategy {
    Random,
    Seeded { seed: u64, counter: u64 },
}

/// Document-scoped identifier source.
///
/// Every id it hands out is distinct from every id it has issued or been told
/// about through [`IdAllocator::reserve`], so a document that reserves its
/// loaded ids never sees a collision, even with the deterministic strategy.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    strategy: Strategy,
    known: HashSet<Identifier>,
}

impl IdAllocator {
    /// UUID v4 identifiers.
    pub fn random() -> Self {
        Self {
            strategy: Strategy::Random,
            known: HashSet::new(),
        }
    }

    /// Deterministic identifiers derived from `seed` and a counter.
    pub fn seeded(seed: u64) -> Self {
        Self {
            strategy: Strategy::Seeded { seed, counter: 0 },
            known: HashSet::new(),
        }
    }

    /// Allocate a fresh identifier.
    pub fn new_id(&mut self) -> Identifier {
        loop {
            let uuid = match &mut self.strategy {
                Strategy::Random => Uuid::new_v4(),
                Strategy::Seeded { seed, counter } => {
                    *counter += 1;
                    Uuid::from_u64_pair(*seed, *counter)
                }
            };
            let id = Identifier(uuid.hyphenated().to_string().to_uppercase());
            if self.known.insert(id.clone()) {
                return id;
            }
        }
    }

    /// Record an identifier that already exists in the document.
    /// Returns `false` if it was already known.
    pub fn reserve(&mut self, id: &Identifier) -> bool {
        self.known.insert(id.clone())
    }

    pub fn is_known(&self, id: &Identifier) -> bool {
        self.known.contains(id)
    }

    /// Number of identifiers issued or reserved.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::random()
    }
}

/// Maps identifiers of a foreign document into the destination's id space
/// for the duration of one merge operation.
///
/// The first lookup of a foreign id allocates a fresh id; later lookups return
/// the same one, so references between imported entities stay consistent.
#[derive(Debug)]
pub struct IdRemapper<'a> {
    ids: &'a mut IdAllocator,
    table: HashMap<Identifier, Identifier>,
}

impl<'a> IdRemapper<'a> {
    pub fn new(ids: &'a mut IdAllocator) -> Self {
        Self {
            ids,
            table: HashMap::new(),
        }
    }

    pub fn remap(&mut self, foreign: &Identifier) -> Identifier {
        if let Some(mapped) = self.table.get(foreign) {
            return mapped.clone();
        }
        let fresh = self.ids.new_id();
        tracing::trace!(from = %foreign, to = %fresh, "remapped identifier");
        self.table.insert(foreign.clone(), fresh.clone());
        fresh
    }

    /// Mapping produced so far (foreign -> destination).
    pub fn mapping(&self) -> &HashMap<Identifier, Identifier> {
        &self.table
    }

    pub fn into_mapping(self) -> HashMap<Identifier, Identifier> {
        self.table
    }
}
