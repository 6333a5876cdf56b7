diesel::table! {
    clipboard_entries (id) {
        id -> Text,
        preview_text -> Text,
        full_text -> Nullable<Text>,
        rich_payload_refs -> Nullable<Text>,
        captured_at -> BigInt,
        is_pinned -> Bool,
        is_sensitive -> Bool,
    }
}
