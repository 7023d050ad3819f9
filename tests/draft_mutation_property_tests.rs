//! Property-based tests for draft mutation and normalisation
//!
//! Random input is thrown at the draft mutators to check that whatever the
//! applicant types, stored values stay within the shape each field allows.

use msme_award::{
    draft::{Draft, Facility, Field, NestedGroup, Sequence, Triplet},
    records::Row,
    utils::PHONE_DIGITS,
};
use proptest::prelude::*;

// PROPERTY TEST STRATEGIES

/// Strategy to pick one of the growable sequences
fn sequence_strategy() -> impl Strategy<Value = Sequence> {
    prop::sample::select(Sequence::ALL.to_vec())
}

/// Strategy to produce numeric looking input, including junk and signs
fn numeric_input_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (-1_000_000.0f64..1_000_000.0).prop_map(|v| v.to_string()),
        (-500i64..500).prop_map(|v| v.to_string()),
        Just(String::new()),
        "[a-z]{1,6}",
    ]
}

// PROPERTY TESTS
proptest! {
    /// Property: phone fields only ever hold up to ten ASCII digits
    #[test]
    fn phone_fields_hold_digits_only(raw in ".{0,40}") {
        let mut draft = Draft::default();
        draft.set_field(Field::Mobile, &raw);
        draft.set_field(Field::Phone, &raw);

        for field in [Field::Mobile, Field::Phone] {
            let value = draft.field(field);
            prop_assert!(value.len() <= PHONE_DIGITS);
            prop_assert!(value.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    /// Property: a percentage is empty or a number between 0 and 100
    #[test]
    fn percentages_are_clamped(raw in numeric_input_strategy(), index in 0usize..3) {
        let mut draft = Draft::default();
        draft.set_triplet_item_field(Triplet::Profit, index, "percent", &raw).unwrap();

        let value = draft.profit[index].percent.clone();
        if !value.is_empty() {
            let number: f64 = value.parse().unwrap();
            prop_assert!((0.0..=100.0).contains(&number));
        }
    }

    /// Property: amounts are never negative
    #[test]
    fn amounts_are_non_negative(raw in numeric_input_strategy()) {
        let mut draft = Draft::default();
        draft.set_nested_field(NestedGroup::Property, "building", &raw).unwrap();
        draft.set_sequence_item_field(Sequence::Machinery, 0, "value", &raw).unwrap();

        for value in [&draft.property.building, &draft.machinery[0].value] {
            if !value.is_empty() {
                prop_assert!(value.parse::<f64>().unwrap() >= 0.0);
            }
        }
    }

    /// Property: input that is not a number leaves the previous value alone
    #[test]
    fn junk_keeps_previous_amount(previous in 0u32..1_000_000, junk in "[a-z]{1,8}") {
        let mut draft = Draft::default();
        draft.set_triplet_item_field(Triplet::ProductCosts, 1, "cost", &previous.to_string()).unwrap();
        draft.set_triplet_item_field(Triplet::ProductCosts, 1, "cost", &junk).unwrap();

        prop_assert_eq!(draft.product_costs[1].cost.clone(), previous.to_string());
    }

    /// Property: the first record of a sequence can never be removed
    #[test]
    fn first_record_is_pinned(sequence in sequence_strategy(), extra in 0usize..5) {
        let mut draft = Draft::default();
        for _ in 0..extra {
            draft.append_sequence_item(sequence);
        }

        prop_assert!(!draft.remove_sequence_item(sequence, 0).unwrap());
        prop_assert_eq!(draft.sequence(sequence).len(), extra + 1);
    }

    /// Property: appending then removing the new record restores the draft
    #[test]
    fn append_then_remove_restores(sequence in sequence_strategy(), name in "[A-Za-z ]{0,12}") {
        let mut draft = Draft::default();
        draft.set_field(Field::UnitName, &name);
        let before = draft.clone();

        let index = draft.append_sequence_item(sequence);
        prop_assert_eq!(index, 1);
        prop_assert!(draft.remove_sequence_item(sequence, index).unwrap());
        prop_assert_eq!(draft, before);
    }

    /// Property: removing past the end is an error and changes nothing
    #[test]
    fn out_of_range_removal_is_rejected(sequence in sequence_strategy(), index in 1usize..50) {
        let mut draft = Draft::default();
        let before = draft.clone();

        prop_assert!(draft.remove_sequence_item(sequence, index).is_err());
        prop_assert_eq!(draft, before);
    }

    /// Property: free text is stored exactly as typed and survives the blob
    #[test]
    fn text_survives_blob(unit in ".{0,30}", remark in ".{0,30}") {
        let mut draft = Draft::default();
        draft.set_field(Field::UnitName, &unit);
        draft.set_triplet_item_field(Triplet::NetProfit, 0, "remark", &remark).unwrap();

        let restored = Draft::from_blob(&draft.to_blob().unwrap()).unwrap();
        prop_assert_eq!(restored.field(Field::UnitName), unit.as_str());
        prop_assert_eq!(restored.triplet(Triplet::NetProfit).row(0).unwrap().get("remark"), Some(remark.as_str()));
    }

    /// Property: every field category survives the blob together
    #[test]
    fn all_categories_survive_blob(
        land in 0u32..10_000_000,
        machinery in 0u32..10_000_000,
        cost in 0u32..1_000_000,
        share in 0u8..=100,
        canteen in any::<bool>(),
    ) {
        let mut draft = Draft::default();
        draft.set_nested_field(NestedGroup::Property, "land", &land.to_string()).unwrap();
        draft.set_nested_field(NestedGroup::Property, "plant_machinery", &machinery.to_string()).unwrap();
        draft.set_triplet_item_field(Triplet::ProductCosts, 1, "cost", &cost.to_string()).unwrap();
        draft.set_sequence_item_field(Sequence::Proprietors, 0, "share", &share.to_string()).unwrap();
        if canteen {
            draft.toggle_facility(Facility::Canteen);
        }

        let restored = Draft::from_blob(&draft.to_blob().unwrap()).unwrap();
        prop_assert_eq!(&restored.property.land, &land.to_string());
        prop_assert_eq!(&restored.property.plant_machinery, &machinery.to_string());
        prop_assert_eq!(restored.facilities.canteen, canteen);
        prop_assert_eq!(restored, draft);
    }
}
