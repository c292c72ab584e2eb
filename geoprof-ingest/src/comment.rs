//! Provenance comment generation
//!
//! Builds the human-readable provenance sentence for each place whose
//! lookup rows carry an annotation. Two shapes exist: places merged from
//! multiple census tracts, and places reporting data from a nearby larger
//! geography shared with other places.

use crate::lookup::PlaceGeographyLink;
use std::collections::HashMap;

/// Build the place id -> comment map from the lookup table.
///
/// Links without an annotation produce an empty comment.
pub fn build_comments(links: &[PlaceGeographyLink]) -> HashMap<String, String> {
    let mut comments = HashMap::new();

    for link in links {
        if link.comment.is_none() {
            comments.entry(link.id.clone()).or_insert_with(String::new);
            continue;
        }

        let comment = if link.area_type == "Census tract" {
            // one-to-many tract merge: list the merged tracts
            let tracts: Vec<&str> = links
                .iter()
                .filter(|l| l.name == link.name)
                .map(|l| l.place_name.as_str())
                .collect();
            if tracts.len() > 1 {
                format!(
                    "Data for this place represent multiple merged census tracts: {}",
                    join_names(&tracts)
                )
            } else {
                String::new()
            }
        } else {
            // nearest-geography attribution: list every place sharing it
            let names: Vec<&str> = links
                .iter()
                .filter(|l| l.place_name == link.place_name)
                .map(|l| l.name.as_str())
                .collect();
            format!(
                "Data represent information from nearest {} ({}), which includes {}.",
                link.area_type.to_lowercase(),
                link.place_name,
                join_names(&names)
            )
        };

        comments.insert(link.id.clone(), comment);
    }

    comments
}

/// Natural-language list joining: "A", "A and B", "A, B, and C"
fn join_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}
