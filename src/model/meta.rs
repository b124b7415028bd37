//! Distinct value lists for the cascading district → local body → ward → booth selectors,
//! and the gender-curation ("others") filter.

use std::str::FromStr;

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::query::{Conjunction, NonEmpty, Predicate};
use crate::model::voter::{fields, STANDARD_GENDERS};

/// One selector entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub code: Option<String>,
    pub name: Option<String>,
}

/// Which selector list is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKind {
    Districts,
    Lbs,
    Wards,
    Booths,
}

impl FromStr for MetaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "districts" => Ok(Self::Districts),
            "lbs" => Ok(Self::Lbs),
            "wards" => Ok(Self::Wards),
            "booths" => Ok(Self::Booths),
            _ => Err(Error::BadRequest("Invalid type".to_string())),
        }
    }
}

/// Query string of the meta endpoint.
#[derive(Debug, Clone, Default, FromForm)]
pub struct MetaQuery {
    #[field(name = "type")]
    pub kind: Option<String>,
    pub district: Option<String>,
    pub lb: Option<String>,
    pub ward: Option<String>,
}

/// Key used to order a selector list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceOrder {
    ByName,
    ByCode,
}

/// Everything needed to fetch one selector list.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaPlan {
    pub scope: Conjunction,
    pub code_field: &'static str,
    pub name_field: &'static str,
    pub order: ChoiceOrder,
}

impl MetaQuery {
    /// Validate the query and work out the grouping and scope.
    ///
    /// Wards need a district. Booths need a ward or a local body, and the ward wins
    /// if both are given.
    pub fn plan(&self) -> Result<MetaPlan> {
        let kind: MetaKind = NonEmpty::from_field(self.kind.as_deref())
            .ok_or_else(|| Error::BadRequest("Missing type parameter".to_string()))?
            .parse()?;
        let district = NonEmpty::from_field(self.district.as_deref());
        let lb = NonEmpty::from_field(self.lb.as_deref());
        let ward = NonEmpty::from_field(self.ward.as_deref());

        let plan = match kind {
            MetaKind::Districts => MetaPlan {
                scope: Conjunction::new(),
                code_field: fields::DISTRICT_CODE,
                name_field: fields::DISTRICT_NAME,
                order: ChoiceOrder::ByName,
            },
            MetaKind::Lbs => MetaPlan {
                scope: Conjunction::new(),
                code_field: fields::LB_CODE,
                name_field: fields::LB_NAME,
                order: ChoiceOrder::ByName,
            },
            MetaKind::Wards => {
                let district =
                    district.ok_or_else(|| Error::BadRequest("district required".to_string()))?;
                MetaPlan {
                    scope: Predicate::equals(fields::DISTRICT_CODE, district.into_inner()).into(),
                    code_field: fields::WARD_NUMBER,
                    name_field: fields::WARD_NAME,
                    order: ChoiceOrder::ByCode,
                }
            }
            MetaKind::Booths => {
                let scope = match (ward, lb) {
                    (Some(ward), _) => Predicate::equals(fields::WARD_NUMBER, ward.into_inner()),
                    (None, Some(lb)) => Predicate::equals(fields::LB_CODE, lb.into_inner()),
                    (None, None) => {
                        return Err(Error::BadRequest("ward or lb must be provided".to_string()))
                    }
                };
                MetaPlan {
                    scope: scope.into(),
                    code_field: fields::BOOTH_NUMBER,
                    name_field: fields::BOOTH_NAME,
                    order: ChoiceOrder::ByCode,
                }
            }
        };
        Ok(plan)
    }
}

/// Order choices by the plan's key, breaking ties with the other field.
pub fn sort_choices(choices: &mut [Choice], order: ChoiceOrder) {
    match order {
        ChoiceOrder::ByName => choices.sort_by(|a, b| (&a.name, &a.code).cmp(&(&b.name, &b.code))),
        ChoiceOrder::ByCode => choices.sort_by(|a, b| (&a.code, &a.name).cmp(&(&b.code, &b.name))),
    }
}

/// Records whose gender needs curation.
///
/// Older imports encode "unknown" in several ways, so all of them are spelled out
/// rather than relying on a single absence check.
pub fn others_filter() -> Conjunction {
    Predicate::AnyOf(vec![
        Predicate::Missing {
            field: fields::GENDER,
        },
        Predicate::equals(fields::GENDER, Bson::Null),
        Predicate::equals(fields::GENDER, ""),
        Predicate::equals(fields::GENDER, "-"),
        Predicate::none_of(fields::GENDER, STANDARD_GENDERS),
    ])
    .into()
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    fn query(kind: &str) -> MetaQuery {
        MetaQuery {
            kind: Some(kind.to_string()),
            ..MetaQuery::default()
        }
    }

    #[test]
    fn type_is_required_and_checked() {
        assert!(matches!(MetaQuery::default().plan(), Err(Error::BadRequest(_))));
        assert!(matches!(query(" ").plan(), Err(Error::BadRequest(_))));
        assert!(matches!(query("houses").plan(), Err(Error::BadRequest(_))));
    }

    #[test]
    fn districts_are_unscoped_and_sorted_by_name() {
        let plan = query("districts").plan().unwrap();
        assert!(plan.scope.is_empty());
        assert_eq!(plan.code_field, "district_code");
        assert_eq!(plan.name_field, "district_name");
        assert_eq!(plan.order, ChoiceOrder::ByName);
    }

    #[test]
    fn wards_need_a_district() {
        assert!(matches!(query("wards").plan(), Err(Error::BadRequest(_))));

        let plan = MetaQuery {
            district: Some("08".to_string()),
            ..query("wards")
        }
        .plan()
        .unwrap();
        assert_eq!(plan.scope.to_document(), doc! { "district_code": "08" });
        assert_eq!(plan.order, ChoiceOrder::ByCode);
    }

    #[test]
    fn booths_prefer_ward_over_local_body() {
        assert!(matches!(query("booths").plan(), Err(Error::BadRequest(_))));

        let by_lb = MetaQuery {
            lb: Some("G08001".to_string()),
            ..query("booths")
        };
        assert_eq!(by_lb.plan().unwrap().scope.to_document(), doc! { "lb_code": "G08001" });

        let by_both = MetaQuery {
            ward: Some("014".to_string()),
            ..by_lb
        };
        assert_eq!(by_both.plan().unwrap().scope.to_document(), doc! { "ward_number": "014" });
    }

    #[test]
    fn choices_sort_by_requested_key() {
        let choice = |code: &str, name: &str| Choice {
            code: Some(code.to_string()),
            name: Some(name.to_string()),
        };
        let mut choices = vec![choice("2", "ALPHA"), choice("1", "BETA")];

        sort_choices(&mut choices, ChoiceOrder::ByName);
        assert_eq!(choices[0].name.as_deref(), Some("ALPHA"));

        sort_choices(&mut choices, ChoiceOrder::ByCode);
        assert_eq!(choices[0].code.as_deref(), Some("1"));
    }

    #[test]
    fn others_filter_spells_out_every_unknown_form() {
        assert_eq!(
            others_filter().to_document(),
            doc! {
                "$or": [
                    { "gender": { "$exists": false } },
                    { "gender": Bson::Null },
                    { "gender": "" },
                    { "gender": "-" },
                    { "gender": { "$nin": ["M", "F"] } },
                ]
            }
        );
    }
}
