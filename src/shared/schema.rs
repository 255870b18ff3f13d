diesel::table! {
    tickets (id) {
        id -> Int4,
        ticket_number -> Varchar,
        title -> Varchar,
        description -> Text,
        priority -> Varchar,
        owner -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    attachments (id) {
        id -> Int4,
        ticket_id -> Int4,
        filename -> Varchar,
        path -> Varchar,
        mimetype -> Varchar,
        size -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(attachments -> tickets (ticket_id));
diesel::allow_tables_to_appear_in_same_query!(tickets, attachments);
