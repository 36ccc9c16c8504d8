mod util;

use std::path::Path;

use msigdb_flat::db::SnapshotScope;
use msigdb_flat::error::FlatTableError;
use msigdb_flat::types::Species;

#[test]
fn test_open_local_and_load() {
    let db_file = util::small_snapshot_file();

    let scope = SnapshotScope::open_local(db_file.path()).unwrap();
    assert_eq!(scope.path(), db_file.path());

    // load_raw() consumes the scope, closing the connection
    let raw = scope.load_raw().unwrap();

    assert_eq!(raw.db_info.version_name.as_str(), "2025.1.Hs");
    assert_eq!(raw.db_info.target_species, Species::HS);
    assert_eq!(raw.gene_sets.len(), 3);
    assert_eq!(raw.gene_set_details.len(), 3);
    assert_eq!(raw.source_members.len(), 7);
    assert_eq!(raw.gene_set_source_members.len(), 8);

    // the rows outlive the scope and the local file is left in place
    assert!(db_file.path().exists());
}

#[test]
fn test_open_local_missing_file() {
    let err = SnapshotScope::open_local(Path::new("no_such_snapshot.db"))
        .err().unwrap();

    assert!(matches!(err, FlatTableError::InvalidArgument(_)));
    assert!(err.to_string().contains("no_such_snapshot.db"));
}
