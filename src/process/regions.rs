// src/process/regions.rs

/// The 48 contiguous states plus the District of Columbia, as
/// `(postal code, name)`. Names match EIA's `stateDescription` and the
/// `name` property of the usual US-states GeoJSON files.
pub static CONTINENTAL: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

/// The canonical spelling of a continental region name, matched trimmed and
/// ignoring ASCII case.
pub fn canonical_name(name: &str) -> Option<&'static str> {
    let name = name.trim();
    CONTINENTAL
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(_, n)| *n)
}

/// Case-insensitive membership test on the region name.
pub fn is_continental(name: &str) -> bool {
    canonical_name(name).is_some()
}

/// Postal codes used as the `location` facet of the by-state query.
pub fn location_codes() -> Vec<&'static str> {
    CONTINENTAL.iter().map(|(code, _)| *code).collect()
}
