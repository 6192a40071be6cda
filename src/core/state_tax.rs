use super::error::{Result, invalid};

// (first prefix, last prefix, state). Earlier rows win where ranges overlap.
const ZIP_PREFIXES: &[(u16, u16, &str)] = &[
    (5, 5, "NY"),
    (55, 55, "MA"),
    (63, 63, "NY"),
    (201, 201, "VA"),
    (569, 569, "DC"),
    (885, 885, "TX"),
    (10, 27, "MA"),
    (28, 29, "RI"),
    (30, 38, "NH"),
    (39, 49, "ME"),
    (50, 59, "VT"),
    (60, 69, "CT"),
    (70, 89, "NJ"),
    (100, 149, "NY"),
    (150, 196, "PA"),
    (197, 199, "DE"),
    (200, 205, "DC"),
    (206, 219, "MD"),
    (220, 246, "VA"),
    (247, 268, "WV"),
    (270, 289, "NC"),
    (290, 299, "SC"),
    (300, 319, "GA"),
    (320, 349, "FL"),
    (350, 369, "AL"),
    (370, 385, "TN"),
    (386, 397, "MS"),
    (398, 399, "GA"),
    (400, 427, "KY"),
    (430, 459, "OH"),
    (460, 479, "IN"),
    (480, 499, "MI"),
    (500, 528, "IA"),
    (530, 549, "WI"),
    (550, 567, "MN"),
    (570, 577, "SD"),
    (580, 588, "ND"),
    (590, 599, "MT"),
    (600, 629, "IL"),
    (630, 658, "MO"),
    (660, 679, "KS"),
    (680, 693, "NE"),
    (700, 714, "LA"),
    (716, 729, "AR"),
    (730, 749, "OK"),
    (750, 799, "TX"),
    (800, 816, "CO"),
    (820, 831, "WY"),
    (832, 838, "ID"),
    (840, 847, "UT"),
    (850, 865, "AZ"),
    (870, 884, "NM"),
    (889, 898, "NV"),
    (900, 961, "CA"),
    (967, 968, "HI"),
    (970, 979, "OR"),
    (980, 994, "WA"),
    (995, 999, "AK"),
];

// Planning approximations of the effective rate a retiree household pays.
const STATE_RATES: &[(&str, f64)] = &[
    ("AK", 0.0),
    ("AL", 0.050),
    ("AR", 0.039),
    ("AZ", 0.025),
    ("CA", 0.060),
    ("CO", 0.044),
    ("CT", 0.050),
    ("DC", 0.065),
    ("DE", 0.055),
    ("FL", 0.0),
    ("GA", 0.0539),
    ("HI", 0.070),
    ("IA", 0.038),
    ("ID", 0.058),
    ("IL", 0.0495),
    ("IN", 0.0305),
    ("KS", 0.052),
    ("KY", 0.040),
    ("LA", 0.030),
    ("MA", 0.050),
    ("MD", 0.0475),
    ("ME", 0.0675),
    ("MI", 0.0425),
    ("MN", 0.068),
    ("MO", 0.047),
    ("MS", 0.044),
    ("MT", 0.059),
    ("NC", 0.0425),
    ("ND", 0.0195),
    ("NE", 0.052),
    ("NH", 0.0),
    ("NJ", 0.055),
    ("NM", 0.049),
    ("NV", 0.0),
    ("NY", 0.060),
    ("OH", 0.035),
    ("OK", 0.0475),
    ("OR", 0.0875),
    ("PA", 0.0307),
    ("RI", 0.0475),
    ("SC", 0.062),
    ("SD", 0.0),
    ("TN", 0.0),
    ("TX", 0.0),
    ("UT", 0.0455),
    ("VA", 0.0575),
    ("VT", 0.066),
    ("WA", 0.0),
    ("WI", 0.053),
    ("WV", 0.0512),
    ("WY", 0.0),
];

pub fn validate_zip(zip_code: &str) -> Result<u16> {
    let zip = zip_code.trim();
    let five = zip.get(..5).unwrap_or(zip);
    let valid_suffix = zip.len() == 5
        || (zip.len() == 10
            && zip.as_bytes()[5] == b'-'
            && zip[6..].bytes().all(|b| b.is_ascii_digit()));
    if five.len() != 5 || !five.bytes().all(|b| b.is_ascii_digit()) || !valid_suffix {
        return Err(invalid(format!(
            "zip code '{zip_code}' must be five digits (optionally ZIP+4)"
        )));
    }
    five[..3]
        .parse::<u16>()
        .map_err(|_| invalid(format!("zip code '{zip_code}' is not numeric")))
}

pub fn state_for_zip(zip_code: &str) -> Result<Option<&'static str>> {
    let prefix = validate_zip(zip_code)?;
    Ok(ZIP_PREFIXES
        .iter()
        .find(|(first, last, _)| (*first..=*last).contains(&prefix))
        .map(|(_, _, state)| *state))
}

pub fn effective_rate(state: &str) -> Option<f64> {
    STATE_RATES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(state))
        .map(|(_, rate)| *rate)
}

pub fn rate_for_zip(zip_code: &str) -> Result<Option<f64>> {
    Ok(state_for_zip(zip_code)?.and_then(effective_rate))
}
