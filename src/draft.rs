//! The application draft: schema, defaults and in-place mutators
//!
//! A draft is the single record edited across all eleven steps. Scalar
//! answers, the property group, the facility flags and the record sequences
//! are persisted as a hex encoded CBOR blob; attachments are kept in memory
//! only (see [`Attachments`]).
use crate::attachment::{Attachment, AttachmentSlot, Attachments};
use crate::error::DraftError;
use crate::records::{
    ExportEntry, GrowableRows, Machine, PollutionControl, Product, ProductCost, ProductionCapacity,
    Proprietor, Row, Rows, YearlyFigure,
};
use crate::types::{FieldKind, today_iso};
use crate::utils::normalise;
use std::str::FromStr;

/// Answer value that switches on a paired description field.
pub const AFFIRMATIVE: &str = "हाँ";

// Declares the scalar answers once: the `Field` enum, its names and the
// `Answers` struct that stores them.
macro_rules! answers {
    ( $( $idx:tt => $field:ident : $variant:ident ),+ $(,)? ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Field {
            $( $variant, )+
        }

        impl Field {
            pub const ALL: &'static [Field] = &[ $( Field::$variant, )+ ];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( Field::$variant => stringify!($field), )+
                }
            }
        }

        #[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
        pub struct Answers {
            $( #[n($idx)] pub $field: String, )+
        }

        impl Answers {
            pub fn get(&self, field: Field) -> &str {
                match field {
                    $( Field::$variant => &self.$field, )+
                }
            }

            fn slot_mut(&mut self, field: Field) -> &mut String {
                match field {
                    $( Field::$variant => &mut self.$field, )+
                }
            }
        }
    };
}

answers! {
    // 1. basic information
    0 => unit_name: UnitName,
    1 => is_women_entrepreneur: IsWomenEntrepreneur,
    2 => capable_entrepreneur: CapableEntrepreneur,
    3 => category: Category,
    4 => business_structure: BusinessStructure,
    5 => director: Director,
    6 => registered_enterprise: RegisteredEnterprise,
    7 => mobile: Mobile,
    8 => address: Address,
    9 => phone: Phone,
    10 => email: Email,
    11 => gst_number: GstNumber,
    // 2. registration and finance
    12 => udyam_number: UdyamNumber,
    13 => filed_itr: FiledItr,
    14 => loan: Loan,
    15 => loan_details: LoanDetails,
    // 3. machinery and energy
    16 => energy_source: EnergySource,
    // 4. workforce
    17 => perm_male: PermMale,
    18 => perm_female: PermFemale,
    19 => perm_sc: PermSc,
    20 => perm_st: PermSt,
    21 => perm_obc: PermObc,
    22 => perm_disabled: PermDisabled,
    23 => temp_male: TempMale,
    24 => temp_female: TempFemale,
    // 6. technology and quality
    25 => tech_used: TechUsed,
    26 => tech_desc: TechDesc,
    27 => prod_dev: ProdDev,
    28 => prod_dev_desc: ProdDevDesc,
    29 => quality_cert: QualityCert,
    30 => quality_cert_desc: QualityCertDesc,
    31 => quality_standard: QualityStandard,
    32 => quality_standard_desc: QualityStandardDesc,
    // 7. human resources
    33 => hire_setup: HireSetup,
    34 => hire_setup_desc: HireSetupDesc,
    35 => training: Training,
    36 => training_desc: TrainingDesc,
    37 => pension_info: PensionInfo,
    // 9. business development
    38 => vendor_dev: VendorDev,
    39 => vendor_dev_desc: VendorDevDesc,
    // 10. anything else
    40 => other_info: OtherInfo,
    // 11. verification
    41 => verification_unit_name: VerificationUnitName,
    42 => verification_date: VerificationDate,
    43 => applicant_name: ApplicantName,
    44 => designation: Designation,
}

impl Field {
    pub fn kind(self) -> FieldKind {
        match self {
            Field::Mobile | Field::Phone => FieldKind::Phone,
            _ => FieldKind::Text,
        }
    }

    /// The yes/no answer that makes this field meaningful, if any.
    pub fn gated_by(self) -> Option<Field> {
        match self {
            Field::LoanDetails => Some(Field::Loan),
            Field::TechDesc => Some(Field::TechUsed),
            Field::ProdDevDesc => Some(Field::ProdDev),
            Field::QualityCertDesc => Some(Field::QualityCert),
            Field::QualityStandardDesc => Some(Field::QualityStandard),
            Field::HireSetupDesc => Some(Field::HireSetup),
            Field::TrainingDesc => Some(Field::Training),
            Field::VendorDevDesc => Some(Field::VendorDev),
            _ => None,
        }
    }
}

impl FromStr for Field {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| DraftError::UnknownField(s.to_string()))
    }
}

/// Asset values by category, in rupees.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct PropertyValues {
    #[n(0)]
    pub land: String,
    #[n(1)]
    pub building: String,
    #[n(2)]
    pub plant_machinery: String,
    #[n(3)]
    pub other_assets: String,
}

impl PropertyValues {
    pub const FIELDS: [&'static str; 4] = ["land", "building", "plant_machinery", "other_assets"];

    fn slot_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "land" => Some(&mut self.land),
            "building" => Some(&mut self.building),
            "plant_machinery" => Some(&mut self.plant_machinery),
            "other_assets" => Some(&mut self.other_assets),
            _ => None,
        }
    }
}

/// Nested groups of the draft. Every field in them is an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NestedGroup {
    Property,
}

impl NestedGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            NestedGroup::Property => "property",
        }
    }
}

impl FromStr for NestedGroup {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "property" => Ok(NestedGroup::Property),
            _ => Err(DraftError::UnknownGroup(s.to_string())),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct Facilities {
    #[n(0)]
    pub toilet: bool,
    #[n(1)]
    pub canteen: bool,
    #[n(2)]
    pub health: bool,
    #[n(3)]
    pub recreation: bool,
    #[n(4)]
    pub library: bool,
    #[n(5)]
    pub transport: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facility {
    Toilet,
    Canteen,
    Health,
    Recreation,
    Library,
    Transport,
}

impl Facility {
    pub const ALL: [Facility; 6] = [
        Facility::Toilet,
        Facility::Canteen,
        Facility::Health,
        Facility::Recreation,
        Facility::Library,
        Facility::Transport,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Facility::Toilet => "toilet",
            Facility::Canteen => "canteen",
            Facility::Health => "health",
            Facility::Recreation => "recreation",
            Facility::Library => "library",
            Facility::Transport => "transport",
        }
    }
}

impl FromStr for Facility {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Facility::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| DraftError::UnknownFacility(s.to_string()))
    }
}

impl Facilities {
    pub fn get(&self, facility: Facility) -> bool {
        match facility {
            Facility::Toilet => self.toilet,
            Facility::Canteen => self.canteen,
            Facility::Health => self.health,
            Facility::Recreation => self.recreation,
            Facility::Library => self.library,
            Facility::Transport => self.transport,
        }
    }

    fn flag_mut(&mut self, facility: Facility) -> &mut bool {
        match facility {
            Facility::Toilet => &mut self.toilet,
            Facility::Canteen => &mut self.canteen,
            Facility::Health => &mut self.health,
            Facility::Recreation => &mut self.recreation,
            Facility::Library => &mut self.library,
            Facility::Transport => &mut self.transport,
        }
    }
}

/// Repeating groups. Each always holds at least one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sequence {
    Proprietors,
    Machinery,
    Products,
    ProductionCapacity,
    Pollution,
}

impl Sequence {
    pub const ALL: [Sequence; 5] = [
        Sequence::Proprietors,
        Sequence::Machinery,
        Sequence::Products,
        Sequence::ProductionCapacity,
        Sequence::Pollution,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Sequence::Proprietors => "proprietors",
            Sequence::Machinery => "machinery",
            Sequence::Products => "products",
            Sequence::ProductionCapacity => "production_capacity",
            Sequence::Pollution => "pollution",
        }
    }
}

impl FromStr for Sequence {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sequence::ALL
            .into_iter()
            .find(|seq| seq.as_str() == s)
            .ok_or_else(|| DraftError::UnknownSequence(s.to_string()))
    }
}

/// Three-year tables, one row per reporting year (i), (ii), (iii).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Triplet {
    ProductCosts,
    Profit,
    NetProfit,
    ExportData,
}

impl Triplet {
    pub const ALL: [Triplet; 4] = [
        Triplet::ProductCosts,
        Triplet::Profit,
        Triplet::NetProfit,
        Triplet::ExportData,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Triplet::ProductCosts => "product_costs",
            Triplet::Profit => "profit",
            Triplet::NetProfit => "net_profit",
            Triplet::ExportData => "export_data",
        }
    }
}

impl FromStr for Triplet {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Triplet::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DraftError::UnknownSequence(s.to_string()))
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    #[n(0)]
    pub answers: Answers,
    #[n(1)]
    pub property: PropertyValues,
    #[n(2)]
    pub facilities: Facilities,
    #[n(3)]
    pub proprietors: Vec<Proprietor>,
    #[n(4)]
    pub machinery: Vec<Machine>,
    #[n(5)]
    pub products: Vec<Product>,
    #[n(6)]
    pub production_capacity: Vec<ProductionCapacity>,
    #[n(7)]
    pub pollution: Vec<PollutionControl>,
    #[n(8)]
    pub product_costs: [ProductCost; 3],
    #[n(9)]
    pub profit: [YearlyFigure; 3],
    #[n(10)]
    pub net_profit: [YearlyFigure; 3],
    #[n(11)]
    pub export_data: [ExportEntry; 3],
    #[n(12)]
    pub attachments: Attachments,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            answers: Answers {
                verification_date: today_iso(),
                ..Default::default()
            },
            property: PropertyValues::default(),
            facilities: Facilities::default(),
            proprietors: vec![Proprietor::default()],
            machinery: vec![Machine::default()],
            products: vec![Product::default()],
            production_capacity: vec![ProductionCapacity::default()],
            pollution: vec![PollutionControl::default()],
            product_costs: Default::default(),
            profit: Default::default(),
            net_profit: Default::default(),
            export_data: Default::default(),
            attachments: Attachments::default(),
        }
    }
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&self, field: Field) -> &str {
        self.answers.get(field)
    }

    pub fn set_field(&mut self, field: Field, raw: &str) {
        if let Some(value) = normalise(field.kind(), raw) {
            *self.answers.slot_mut(field) = value;
        }
    }

    pub fn set_nested_field(&mut self, group: NestedGroup, field: &str, raw: &str) -> Result<(), DraftError> {
        let slot = match group {
            NestedGroup::Property => self.property.slot_mut(field),
        }
        .ok_or_else(|| DraftError::UnknownField(format!("{}.{field}", group.as_str())))?;
        if let Some(value) = normalise(FieldKind::Amount, raw) {
            *slot = value;
        }
        Ok(())
    }

    pub fn sequence(&self, sequence: Sequence) -> &dyn Rows {
        match sequence {
            Sequence::Proprietors => &self.proprietors,
            Sequence::Machinery => &self.machinery,
            Sequence::Products => &self.products,
            Sequence::ProductionCapacity => &self.production_capacity,
            Sequence::Pollution => &self.pollution,
        }
    }

    fn sequence_mut(&mut self, sequence: Sequence) -> &mut dyn GrowableRows {
        match sequence {
            Sequence::Proprietors => &mut self.proprietors,
            Sequence::Machinery => &mut self.machinery,
            Sequence::Products => &mut self.products,
            Sequence::ProductionCapacity => &mut self.production_capacity,
            Sequence::Pollution => &mut self.pollution,
        }
    }

    pub fn triplet(&self, triplet: Triplet) -> &dyn Rows {
        match triplet {
            Triplet::ProductCosts => &self.product_costs,
            Triplet::Profit => &self.profit,
            Triplet::NetProfit => &self.net_profit,
            Triplet::ExportData => &self.export_data,
        }
    }

    fn triplet_mut(&mut self, triplet: Triplet) -> &mut dyn Rows {
        match triplet {
            Triplet::ProductCosts => &mut self.product_costs,
            Triplet::Profit => &mut self.profit,
            Triplet::NetProfit => &mut self.net_profit,
            Triplet::ExportData => &mut self.export_data,
        }
    }

    pub fn set_sequence_item_field(
        &mut self,
        sequence: Sequence,
        index: usize,
        field: &str,
        raw: &str,
    ) -> Result<(), DraftError> {
        set_row_field(
            self.sequence_mut(sequence),
            sequence.as_str(),
            index,
            field,
            raw,
        )
    }

    pub fn set_triplet_item_field(
        &mut self,
        triplet: Triplet,
        index: usize,
        field: &str,
        raw: &str,
    ) -> Result<(), DraftError> {
        set_row_field(self.triplet_mut(triplet), triplet.as_str(), index, field, raw)
    }

    /// Appends an empty record and returns its index.
    pub fn append_sequence_item(&mut self, sequence: Sequence) -> usize {
        let rows = self.sequence_mut(sequence);
        rows.push_empty();
        rows.len() - 1
    }

    /// Removes the record at `index`. The first record is pinned, so index 0
    /// is a no-op and returns `Ok(false)`.
    pub fn remove_sequence_item(&mut self, sequence: Sequence, index: usize) -> Result<bool, DraftError> {
        if index == 0 {
            return Ok(false);
        }
        let rows = self.sequence_mut(sequence);
        let len = rows.len();
        if index >= len {
            return Err(DraftError::IndexOutOfRange {
                field: sequence.as_str(),
                index,
                len,
            });
        }
        rows.remove_at(index);
        Ok(true)
    }

    /// Flips a facility flag and returns its new value.
    pub fn toggle_facility(&mut self, facility: Facility) -> bool {
        let flag = self.facilities.flag_mut(facility);
        *flag = !*flag;
        *flag
    }

    pub fn attachment(&self, slot: AttachmentSlot) -> Option<&Attachment> {
        self.attachments.get(slot)
    }

    /// Whether a description field carries meaning, i.e. its paired yes/no
    /// answer is affirmative. Fields without a pair are always applicable.
    pub fn is_applicable(&self, field: Field) -> bool {
        match field.gated_by() {
            Some(flag) => is_affirmative(self.field(flag)),
            None => true,
        }
    }

    /// The ITR certificate only matters when the unit says it filed returns.
    pub fn is_slot_applicable(&self, slot: AttachmentSlot) -> bool {
        match slot {
            AttachmentSlot::ItrCertificate => is_affirmative(self.field(Field::FiledItr)),
            AttachmentSlot::PensionDocument | AttachmentSlot::Signature => true,
        }
    }

    /// Saturates at `u64::MAX`.
    pub fn permanent_workforce(&self) -> u64 {
        count(self.field(Field::PermMale)).saturating_add(count(self.field(Field::PermFemale)))
    }

    pub fn temporary_workforce(&self) -> u64 {
        count(self.field(Field::TempMale)).saturating_add(count(self.field(Field::TempFemale)))
    }

    /// Copy of the draft with every attachment slot emptied.
    pub fn without_attachments(&self) -> Draft {
        Draft {
            attachments: Attachments::default(),
            ..self.clone()
        }
    }

    /// CBOR encoding of everything except attachments.
    pub fn to_cbor(&self) -> Result<Vec<u8>, DraftError> {
        minicbor::to_vec(self).map_err(|e| DraftError::Encode(e.to_string()))
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, DraftError> {
        Ok(minicbor::decode(bytes)?)
    }

    /// Hex encoded CBOR, for string valued stores.
    pub fn to_blob(&self) -> Result<String, DraftError> {
        Ok(hex::encode(self.to_cbor()?))
    }

    pub fn from_blob(blob: &str) -> Result<Self, DraftError> {
        Self::from_cbor(&hex::decode(blob.trim())?)
    }
}

fn set_row_field<R: Rows + ?Sized>(
    rows: &mut R,
    name: &'static str,
    index: usize,
    field: &str,
    raw: &str,
) -> Result<(), DraftError> {
    let len = rows.len();
    rows.row_mut(index)
        .ok_or(DraftError::IndexOutOfRange {
            field: name,
            index,
            len,
        })?
        .set(field, raw)
}

pub fn is_affirmative(value: &str) -> bool {
    let value = value.trim();
    value == AFFIRMATIVE || value.eq_ignore_ascii_case("yes")
}

fn count(value: &str) -> u64 {
    value.trim().parse().unwrap_or(0)
}
