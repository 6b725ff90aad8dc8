//! Version and identity scalars used across the catalog protocol.

/// Catalog version type.
///
/// Strictly monotonically increasing and global to the cluster: every
/// committed schema change advances it by exactly 1, and it never decreases.
/// A session's cached schema snapshot is trustworthy only while its recorded
/// version equals the authority's current value.
pub type CatalogVersion = u64;

/// Version of a freshly initialized, empty catalog.
pub const INITIAL_CATALOG_VERSION: CatalogVersion = 1;

/// Structural identity of a schema object.
///
/// Allocated once at CREATE and never reused. DROP retires the id; a later
/// CREATE under the same name allocates a fresh one, which is what lets the
/// protocol distinguish "same name, new object" from "same object".
pub type ObjectId = u64;

/// Stable per-object column identity.
///
/// Field ids survive ALTER: adding a column allocates the next id, dropping
/// one retires it. Physical storage keys column data by `(ObjectId, FieldId)`,
/// so a recreated column never aliases old data.
pub type FieldId = u32;
