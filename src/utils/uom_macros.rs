#![warn(missing_docs)]
//! Macros for the creation of single uom unit values (wavelengths are the
//! only quantity this crate carries with explicit units).

/// helper macro to create the units
#[macro_export]
macro_rules! uom_unit_creator {
    ($unit:ident, $unit_type:ident, $val:expr) => {
        $unit_type::new::<$unit>($val)
    };
}

///macro to create a Length in micrometer
#[macro_export]
macro_rules! micrometer {
    ($x:expr) => {{
        use uom::si::{f64::Length, length::micrometer};
        $crate::uom_unit_creator![micrometer, Length, $x]
    }};
}
///macro to create a Length in nanometer
#[macro_export]
macro_rules! nanometer {
    ($x:expr) => {{
        use uom::si::{f64::Length, length::nanometer};
        $crate::uom_unit_creator![nanometer, Length, $x]
    }};
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use uom::si::length::micrometer;
    #[test]
    fn micrometer_macro() {
        assert_relative_eq!(micrometer!(0.58756).get::<micrometer>(), 0.58756);
    }
    #[test]
    fn nanometer_macro() {
        assert_relative_eq!(nanometer!(587.56).get::<micrometer>(), 0.58756);
    }
}
