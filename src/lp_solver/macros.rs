//! Macros for the LP solver module
//!
//! This module contains the macros used to create branded models and to write
//! constraints with comparison syntax.

/// Create a new model with a unique brand
///
/// Each invocation defines a fresh brand type, so variables of one model cannot
/// be used in another. An optional second argument passes a [`ModelConfig`].
///
/// [`ModelConfig`]: crate::lp_solver::ModelConfig
///
/// # Examples
///
/// ```rust
/// use cropplan::lp_model;
/// use cropplan::lp_solver::{ModelConfig, NamingStyle, VariableType};
///
/// // Anonymous brand (each call creates unique anonymous type)
/// let mut model = lp_model!();
/// let x = model.add_variable("x", VariableType::Binary, 0.0, 1.0).unwrap();
///
/// // Named brand (easier to identify in type errors)
/// let mut fields = lp_model!(FieldModel);
///
/// // Named brand with configuration
/// let config = ModelConfig { naming_style: NamingStyle::ShortNames, ..Default::default() };
/// let mut greenhouse = lp_model!(GreenhouseModel, config);
///
/// // This would cause a compile-time error due to different brands:
/// // fields.add_constraint(cropplan::constraint!((x) <= 1.0)); // ERROR!
/// # let _ = (x, &mut fields, &mut greenhouse);
/// ```
#[macro_export]
macro_rules! lp_model {
    // Named brand with explicit configuration
    ($brand_name:ident, $config:expr) => {{
        struct $brand_name;
        $crate::lp_solver::Model::<$brand_name>::with_config($config)
    }};

    // Named brand - user provides the brand name
    ($brand_name:ident) => {{
        struct $brand_name;
        $crate::lp_solver::Model::<$brand_name>::new()
    }};

    // Anonymous brand - the `UniqueBrand` struct is defined locally within the `{{ ... }}` block,
    // so each macro invocation creates a fresh scope with its own distinct `UniqueBrand` type
    () => {{
        struct UniqueBrand;
        $crate::lp_solver::Model::<UniqueBrand>::new()
    }};
}

/// Create constraints using natural comparison syntax
///
/// Expands to the matching [`Constraint`](crate::lp_solver::Constraint) builder, so
/// the result is a constraint value, never a boolean. The left-hand side must be in
/// parentheses. An optional leading name is attached to the constraint.
///
/// # Examples
///
/// ```rust
/// use cropplan::{constraint, lp_model};
/// use cropplan::lp_solver::VariableType;
///
/// let mut model = lp_model!(PlotModel);
/// let x = model.add_variable("x", VariableType::Binary, 0.0, 1.0).unwrap();
/// let y = model.add_variable("y", VariableType::Binary, 0.0, 1.0).unwrap();
///
/// let c1 = constraint!((x + y) == 1.0);
/// let c2 = constraint!((2.0 * x) <= 1);
/// let c3 = constraint!((x - y) >= 0.0);
///
/// model.add_constraint(constraint!("one_per_day", (x + y) <= 1.0)).unwrap();
/// # let _ = (c1, c2, c3);
/// ```
#[macro_export]
macro_rules! constraint {
    (($lhs:expr) == $rhs:expr) => {
        $crate::lp_solver::Constraint::eq($lhs, $rhs as f64)
    };
    (($lhs:expr) <= $rhs:expr) => {
        $crate::lp_solver::Constraint::le($lhs, $rhs as f64)
    };
    (($lhs:expr) >= $rhs:expr) => {
        $crate::lp_solver::Constraint::ge($lhs, $rhs as f64)
    };

    // Named constraints
    ($name:expr, ($lhs:expr) == $rhs:expr) => {
        $crate::lp_solver::Constraint::eq($lhs, $rhs as f64).named($name)
    };
    ($name:expr, ($lhs:expr) <= $rhs:expr) => {
        $crate::lp_solver::Constraint::le($lhs, $rhs as f64).named($name)
    };
    ($name:expr, ($lhs:expr) >= $rhs:expr) => {
        $crate::lp_solver::Constraint::ge($lhs, $rhs as f64).named($name)
    };
}
