diesel::table! {
    products (id) {
        id -> Uuid,
        name -> Varchar,
        price -> Numeric,
        inventory -> Nullable<Int4>,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    carts (user_id) {
        user_id -> Uuid,
        items -> Jsonb,
        subtotal -> Numeric,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    reservations (user_id) {
        user_id -> Uuid,
        items -> Jsonb,
        expires_at -> Timestamptz,
    }
}

diesel::table! {
    orders (id) {
        id -> Uuid,
        user_id -> Uuid,
        items -> Jsonb,
        subtotal -> Numeric,
        tax -> Numeric,
        delivery_fee -> Numeric,
        total -> Numeric,
        delivery_address -> Jsonb,
        payment_method -> Varchar,
        status -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    products,
    carts,
    reservations,
    orders,
);
