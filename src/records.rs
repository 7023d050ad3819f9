//! Record shapes used by the repeating groups and three-year tables
use crate::error::DraftError;
use crate::types::FieldKind;
use crate::utils::normalise;

/// A uniform record inside a sequence, addressed field by field.
pub trait Row {
    /// Field names with the normalisation applied on entry.
    fn fields(&self) -> &'static [(&'static str, FieldKind)];
    fn slot(&self, field: &str) -> Option<&String>;
    fn slot_mut(&mut self, field: &str) -> Option<&mut String>;

    fn get(&self, field: &str) -> Option<&str> {
        self.slot(field).map(String::as_str)
    }

    fn set(&mut self, field: &str, raw: &str) -> Result<(), DraftError> {
        let kind = self
            .fields()
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| DraftError::UnknownField(field.to_string()))?;
        let slot = self
            .slot_mut(field)
            .ok_or_else(|| DraftError::UnknownField(field.to_string()))?;
        if let Some(value) = normalise(kind, raw) {
            *slot = value;
        }
        Ok(())
    }
}

// Declares a record struct whose fields are all strings, plus its `Row` impl.
macro_rules! record {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $idx:tt => $field:ident : $kind:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
        pub struct $name {
            $( #[n($idx)] pub $field: String, )+
        }

        impl Row for $name {
            fn fields(&self) -> &'static [(&'static str, FieldKind)] {
                &[ $( (stringify!($field), FieldKind::$kind) ),+ ]
            }
            fn slot(&self, field: &str) -> Option<&String> {
                match field {
                    $( stringify!($field) => Some(&self.$field), )+
                    _ => None,
                }
            }
            fn slot_mut(&mut self, field: &str) -> Option<&mut String> {
                match field {
                    $( stringify!($field) => Some(&mut self.$field), )+
                    _ => None,
                }
            }
        }
    };
}

record! {
    /// Owner or partner and their share of the enterprise.
    Proprietor { 0 => name: Text, 1 => share: Percent }
}

record! {
    /// One installed machine; `imported` is "स्वदेशी" (domestic) or "आयातित" (imported).
    Machine { 0 => name: Text, 1 => imported: Text, 2 => value: Amount }
}

record! {
    Product { 0 => name: Text, 1 => capacity: Text }
}

record! {
    /// Installed versus actual production for one product and year.
    ProductionCapacity {
        0 => product: Text,
        1 => year: Text,
        2 => capacity: Text,
        3 => actual: Text,
        4 => utilization: Percent,
    }
}

record! {
    /// Pollution control measure and what it cost.
    PollutionControl { 0 => name: Text, 1 => year: Text, 2 => cost: Amount }
}

record! {
    ProductCost { 0 => year: Text, 1 => cost: Amount }
}

record! {
    /// Profit figure for one reporting year, with growth percentage.
    YearlyFigure { 0 => value: Amount, 1 => percent: Percent, 2 => remark: Text }
}

record! {
    ExportEntry {
        0 => product: Text,
        1 => country: Text,
        2 => year: Text,
        3 => quantity: Amount,
        4 => percent: Percent,
    }
}

/// Object-safe view over a sequence of rows.
pub trait Rows {
    fn len(&self) -> usize;
    fn row_mut(&mut self, index: usize) -> Option<&mut dyn Row>;
    fn row(&self, index: usize) -> Option<&dyn Row>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rows that can grow and shrink.
pub trait GrowableRows: Rows {
    fn push_empty(&mut self);
    fn remove_at(&mut self, index: usize);
}

impl<T: Row + Default + 'static> Rows for Vec<T> {
    fn len(&self) -> usize {
        <[T]>::len(self)
    }
    fn row_mut(&mut self, index: usize) -> Option<&mut dyn Row> {
        self.get_mut(index).map(|row| row as &mut dyn Row)
    }
    fn row(&self, index: usize) -> Option<&dyn Row> {
        self.get(index).map(|row| row as &dyn Row)
    }
}

impl<T: Row + Default + 'static> GrowableRows for Vec<T> {
    fn push_empty(&mut self) {
        self.push(T::default());
    }
    fn remove_at(&mut self, index: usize) {
        self.remove(index);
    }
}

impl<T: Row + 'static, const N: usize> Rows for [T; N] {
    fn len(&self) -> usize {
        N
    }
    fn row_mut(&mut self, index: usize) -> Option<&mut dyn Row> {
        self.get_mut(index).map(|row| row as &mut dyn Row)
    }
    fn row(&self, index: usize) -> Option<&dyn Row> {
        self.get(index).map(|row| row as &dyn Row)
    }
}
