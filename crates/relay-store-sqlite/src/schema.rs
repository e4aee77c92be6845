//! SQL schema for the event store.
//!
//! Executed on open only when the `events` table is missing. The column list
//! of `events` must stay in step with [`crate::encode::COLUMNS`].

pub const SCHEMA: &str = "
CREATE TABLE events (
    id                                     INTEGER PRIMARY KEY,
    object_reference                       TEXT NOT NULL UNIQUE,
    event_type                             TEXT,

    activity_reference_number              TEXT,
    work_reference_number                  TEXT,
    section_58_reference_number            TEXT,
    permit_reference_number                TEXT,

    usrn                                   TEXT,
    street_name                            TEXT,
    area_name                              TEXT,
    town                                   TEXT,
    highway_authority                      TEXT,
    highway_authority_swa_code             TEXT,
    promoter_swa_code                      TEXT,
    promoter_organisation                  TEXT,

    activity_coordinates                   TEXT,   -- WKT
    activity_location_type                 TEXT,
    activity_location_description          TEXT,
    works_location_coordinates             TEXT,   -- WKT
    works_location_type                    TEXT,
    section_58_coordinates                 TEXT,   -- WKT
    section_58_location_type               TEXT,

    work_category                          TEXT,
    work_category_ref                      TEXT,
    work_status                            TEXT,
    work_status_ref                        TEXT,
    traffic_management_type                TEXT,
    traffic_management_type_ref            TEXT,
    current_traffic_management_type        TEXT,
    current_traffic_management_type_ref    TEXT,
    road_category                          TEXT,
    activity_type                          TEXT,
    activity_type_details                  TEXT,
    section_58_status                      TEXT,
    section_58_duration                    TEXT,
    section_58_extent                      TEXT,
    permit_status                          TEXT,

    is_ttro_required                       TEXT,
    is_covid_19_response                   TEXT,
    is_traffic_sensitive                   TEXT,
    is_deemed                              TEXT,
    collaborative_working                  TEXT,
    cancelled                              TEXT,
    traffic_management_required            TEXT,

    permit_conditions                      TEXT,
    collaboration_type                     TEXT,
    collaboration_type_ref                 TEXT,
    close_footway                          TEXT,
    close_footway_ref                      TEXT,

    -- RFC 3339 instants with their original offset
    proposed_start_date                    TEXT,
    proposed_end_date                      TEXT,
    proposed_start_time                    TEXT,
    proposed_end_time                      TEXT,
    actual_start_date_time                 TEXT,
    actual_end_date_time                   TEXT,
    start_date                             TEXT,
    start_time                             TEXT,
    end_date                               TEXT,
    end_time                               TEXT,
    current_traffic_management_update_date TEXT
);

-- One row per event, same id. Coordinates are stored as 32-bit floats
-- rounded outward.
CREATE VIRTUAL TABLE events_rtree USING rtree(id, minx, maxx, miny, maxy);

CREATE INDEX events_permit_status_idx               ON events(permit_status);
CREATE INDEX events_traffic_management_type_ref_idx ON events(traffic_management_type_ref);
CREATE INDEX events_work_status_ref_idx             ON events(work_status_ref);
CREATE INDEX events_work_category_ref_idx           ON events(work_category_ref);
CREATE INDEX events_road_category_idx               ON events(road_category);
CREATE INDEX events_highway_authority_idx           ON events(highway_authority);
CREATE INDEX events_promoter_organisation_idx       ON events(promoter_organisation);
CREATE INDEX events_promoter_swa_code_idx           ON events(promoter_swa_code);
";
