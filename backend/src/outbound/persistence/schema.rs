//! Diesel table definitions.
//!
//! Must match `backend/migrations`. Regenerate with `diesel print-schema`
//! after changing a migration.

diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Varchar,
        email -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// One row per account; created on registration.
    profiles (user_id) {
        user_id -> Uuid,
        first_name -> Varchar,
        last_name -> Varchar,
        address -> Varchar,
        /// Cadence code such as `D` or `7D`; null disables digests.
        notification -> Nullable<Varchar>,
        email_language -> Varchar,
        supervisor_id -> Nullable<Uuid>,
        supervision_question -> Bool,
    }
}

diesel::table! {
    crop_types (id) {
        id -> Int8,
        name -> Varchar,
        root_depth_max -> Float8,
        root_depth_min -> Float8,
        max_allowed_depletion -> Float8,
    }
}

diesel::table! {
    irrigation_types (id) {
        id -> Int8,
        name -> Varchar,
        efficiency -> Float8,
    }
}

diesel::table! {
    fields (id) {
        id -> Uuid,
        owner_id -> Uuid,
        name -> Varchar,
        longitude -> Float8,
        latitude -> Float8,
        crop_type_id -> Int8,
        irrigation_type_id -> Int8,
        wetted_area -> Float8,
        use_custom_parameters -> Bool,
        custom_root_depth_max -> Nullable<Float8>,
        custom_root_depth_min -> Nullable<Float8>,
        custom_max_allowed_depletion -> Nullable<Float8>,
        custom_efficiency -> Nullable<Float8>,
        custom_irrigation_optimizer -> Nullable<Float8>,
        custom_field_capacity -> Nullable<Float8>,
        custom_wilting_point -> Nullable<Float8>,
        soil_field_capacity -> Nullable<Float8>,
        soil_wilting_point -> Nullable<Float8>,
        in_covered_area -> Bool,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Manual and automatic irrigation records. Operand columns not used by
    /// `irrigation_kind` are null.
    applied_irrigations (id) {
        id -> Uuid,
        field_id -> Uuid,
        irrigated_at -> Timestamptz,
        irrigation_kind -> Varchar,
        supplied_water_volume -> Nullable<Float8>,
        duration_minutes -> Nullable<Int4>,
        flow_rate -> Nullable<Float8>,
        reading_start -> Nullable<Float8>,
        reading_end -> Nullable<Float8>,
        water_percentage -> Nullable<Int2>,
        is_automatically_reported -> Bool,
    }
}

diesel::table! {
    telemetric_devices (field_id) {
        field_id -> Uuid,
        device_kind -> Varchar,
        device_id -> Varchar,
        water_percentage -> Int2,
        settings -> Jsonb,
    }
}

diesel::joinable!(applied_irrigations -> fields (field_id));
diesel::joinable!(fields -> crop_types (crop_type_id));
diesel::joinable!(fields -> irrigation_types (irrigation_type_id));
diesel::joinable!(fields -> users (owner_id));
diesel::joinable!(telemetric_devices -> fields (field_id));

diesel::allow_tables_to_appear_in_same_query!(
    applied_irrigations,
    crop_types,
    fields,
    irrigation_types,
    profiles,
    telemetric_devices,
    users,
);
