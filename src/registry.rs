//! Known resource types and their hashes.
//!
//! Bundles only carry the hash of a resource's type name. The table below
//! was recovered by hashing likely names, so it is incomplete by nature and
//! an unknown hash must always resolve to something usable.
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::murmur::hash_str;

/// Type names paired with the extension given to extracted files.
const KNOWN_TYPES: &[(&str, &str)] = &[
    ("config", "txt"),
    ("render_config", "txt"),
    ("unit", "dat"),
    ("shader_library_group", "txt"),
    ("shader_library", "txt"),
    ("shader", "txt"),
    ("texture", "txt"),
    ("material", "txt"),
    ("animation", "txt"),
    ("animation_curves", "txt"),
    ("bones", "txt"),
    ("state_machine", "txt"),
    ("physics_properties", "txt"),
    ("package", "txt"),
    ("particles", "txt"),
    ("sound_environment", "txt"),
    ("font", "ttf"),
    ("vaw", "txt"),
    ("aul", "txt"),
    ("level", "txt"),
    ("data", "txt"),
    ("shading_environment", "txt"),
    ("strings", "txt"),
    ("network_config", "txt"),
    ("mouse_cursor", "txt"),
    ("timpani_bank", "txt"),
    ("flow", "txt"),
    ("surface_properties", "txt"),
    ("baked_lighting", "txt"),
    ("mp4", "txt"),
    ("ivf", "txt"),
    ("bik", "txt"),
    ("vector_field", "txt"),
    ("cane", "txt"),
    ("cane_tilecache", "txt"),
    ("entity", "txt"),
    ("scene", "txt"),
    ("bpa", "txt"),
    ("lua", "lua"),
    ("script", "lua"),
    ("scripts", "lua"),
];

/// How an extracted file's suffix is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Naming {
    /// Registry extension, e.g. `42.txt`.
    #[default]
    Extension,
    /// Registry type name, e.g. `42.config`. Can be packed back losslessly.
    Type,
    /// Decimal type hash, e.g. `42.9395731711128973874`.
    Hash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    pub name: &'static str,
    pub hash: u64,
    pub extension: &'static str,
}

#[derive(Debug, Clone)]
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
    by_hash: HashMap<u64, usize>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let entries: Vec<TypeEntry> = KNOWN_TYPES
            .iter()
            .map(|&(name, extension)| TypeEntry {
                name,
                hash: hash_str(name),
                extension,
            })
            .collect();

        let by_hash = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.hash, index))
            .collect();

        Self { entries, by_hash }
    }

    /// Process-wide registry, built on first use.
    pub fn global() -> &'static TypeRegistry {
        static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
        REGISTRY.get_or_init(TypeRegistry::new)
    }

    pub fn entries(&self) -> &[TypeEntry] {
        &self.entries
    }

    pub fn lookup(&self, type_hash: u64) -> Option<&TypeEntry> {
        self.by_hash.get(&type_hash).map(|&index| &self.entries[index])
    }

    /// Extension for the given type, or the decimal hash when the type is unknown.
    pub fn extension_for(&self, type_hash: u64) -> Cow<'static, str> {
        match self.lookup(type_hash) {
            Some(entry) => Cow::Borrowed(entry.extension),
            None => Cow::Owned(type_hash.to_string()),
        }
    }

    /// Type name for the given type, or the decimal hash when the type is unknown.
    pub fn type_name_for(&self, type_hash: u64) -> Cow<'static, str> {
        match self.lookup(type_hash) {
            Some(entry) => Cow::Borrowed(entry.name),
            None => Cow::Owned(type_hash.to_string()),
        }
    }

    /// File suffix (without the dot) under the given naming scheme.
    pub fn suffix_for(&self, type_hash: u64, naming: Naming) -> Cow<'static, str> {
        match naming {
            Naming::Extension => self.extension_for(type_hash),
            Naming::Type => self.type_name_for(type_hash),
            Naming::Hash => Cow::Owned(type_hash.to_string()),
        }
    }

    /// Type hash of a file's type component.
    ///
    /// A purely numeric string is taken as the hash itself, anything else is hashed.
    pub fn hash_for(type_name: &str) -> u64 {
        if is_numeric(type_name) {
            if let Ok(hash) = type_name.parse::<u64>() {
                return hash;
            }
        }
        hash_str(type_name)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the string is a non-empty run of ASCII digits.
pub fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
