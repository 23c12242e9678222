// Table definitions for the local index database (spec §3).
//
// Hand-written rather than `diesel print-schema`-generated, since this
// workspace does not run the Diesel CLI; the shapes below match what that
// CLI would emit against `migrations/`.

diesel::table! {
    remote_volume (id) {
        id -> BigInt,
        name -> Text,
        kind -> Text,
        state -> Text,
        size -> BigInt,
        hash -> Nullable<Text>,
        delete_grace_period -> Nullable<BigInt>,
        created_at -> BigInt,
    }
}

diesel::table! {
    block (id) {
        id -> BigInt,
        hash -> Text,
        size -> BigInt,
        volume_id -> BigInt,
    }
}

diesel::table! {
    deleted_block (hash, size, volume_id) {
        hash -> Text,
        size -> BigInt,
        volume_id -> BigInt,
    }
}

diesel::table! {
    duplicate_block (block_id, volume_id) {
        block_id -> BigInt,
        volume_id -> BigInt,
    }
}

diesel::table! {
    blockset (id) {
        id -> BigInt,
        full_hash -> Text,
        length -> BigInt,
    }
}

diesel::table! {
    blockset_entry (blockset_id, index) {
        blockset_id -> BigInt,
        index -> BigInt,
        block_id -> BigInt,
    }
}

diesel::table! {
    blocklist_hash (blockset_id, index) {
        blockset_id -> BigInt,
        index -> BigInt,
        hash -> Text,
    }
}

diesel::table! {
    metadataset (id) {
        id -> BigInt,
        blockset_id -> BigInt,
    }
}

diesel::table! {
    path_prefix (id) {
        id -> BigInt,
        prefix -> Text,
    }
}

diesel::table! {
    file_lookup (id) {
        id -> BigInt,
        path_prefix_id -> BigInt,
        name -> Text,
        blockset_id -> BigInt,
        metadata_id -> Nullable<BigInt>,
    }
}

diesel::table! {
    fileset (id) {
        id -> BigInt,
        timestamp -> BigInt,
        volume_id -> BigInt,
        is_full_backup -> Bool,
    }
}

diesel::table! {
    fileset_entry (fileset_id, file_id) {
        fileset_id -> BigInt,
        file_id -> BigInt,
        last_modified -> BigInt,
    }
}

diesel::table! {
    index_block_link (index_volume_id, block_volume_id) {
        index_volume_id -> BigInt,
        block_volume_id -> BigInt,
    }
}

diesel::table! {
    change_journal_data (id) {
        id -> BigInt,
        fileset_entry_id -> BigInt,
        path -> Text,
        event_kind -> Text,
        observed_at -> BigInt,
    }
}

diesel::table! {
    small_blockset_link (blockset_id) {
        blockset_id -> BigInt,
        hash -> Text,
    }
}

diesel::table! {
    option (key) {
        key -> Text,
        value -> Text,
    }
}

diesel::table! {
    backup (id) {
        id -> BigInt,
        name -> Text,
        target_url -> Text,
    }
}

diesel::joinable!(file_lookup -> path_prefix (path_prefix_id));
diesel::joinable!(file_lookup -> metadataset (metadata_id));
diesel::joinable!(fileset -> remote_volume (volume_id));
diesel::joinable!(block -> remote_volume (volume_id));
diesel::joinable!(metadataset -> blockset (blockset_id));

diesel::allow_tables_to_appear_in_same_query!(
    remote_volume,
    block,
    deleted_block,
    duplicate_block,
    blockset,
    blockset_entry,
    blocklist_hash,
    metadataset,
    path_prefix,
    file_lookup,
    fileset,
    fileset_entry,
    index_block_link,
    change_journal_data,
    small_blockset_link,
    option,
    backup,
);
