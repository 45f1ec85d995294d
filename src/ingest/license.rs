/// Human readable label of a data.gouv.fr license code.
pub fn license_label(code: &str) -> Option<&'static str> {
    Some(match code {
        "lov2" => "Licence Ouverte / Open Licence version 2.0",
        "fr-lo" => "Licence Ouverte / Open Licence",
        "odc-odbl" => "Open Data Commons Open Database License (ODbL)",
        "odc-by" => "Open Data Commons Attribution License",
        "odc-pddl" => "Open Data Commons Public Domain Dedication and Licence (PDDL)",
        "cc-by" => "Creative Commons Attribution",
        "cc-by-sa" => "Creative Commons Attribution Share-Alike",
        "cc-zero" => "Creative Commons CCZero",
        "other-at" => "Other (Attribution)",
        "other-open" => "Other (Open)",
        "other-pd" => "Other (Public Domain)",
        "notspecified" => "License Not Specified",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::license_label;

    #[test]
    fn test_known_and_unknown_codes() {
        assert_eq!(
            license_label("odc-odbl"),
            Some("Open Data Commons Open Database License (ODbL)")
        );
        assert_eq!(
            license_label("lov2"),
            Some("Licence Ouverte / Open Licence version 2.0")
        );
        assert_eq!(license_label("proprietary"), None);
    }
}
