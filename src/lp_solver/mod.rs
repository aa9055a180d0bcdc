//! Mixed-integer linear modelling layer
//!
//! This module turns a declarative description of decision variables and rules into
//! a mixed-integer linear program and hands it to an external solver backend. It is
//! independent of any particular backend: models are lowered into a plain
//! [`Problem`] which a [`LpSolver`] implementation consumes.
//!
//! # Type Safety with Branded Types
//!
//! All core types (`VariableId`, `LinearExpression`, `Constraint`, `Model`) use a
//! generic `Brand` type parameter. Variables from one model cannot be used in the
//! constraints of another model; the brand is a zero-sized phantom type and costs
//! nothing at runtime.
//!
//! Use the [`lp_model!`](crate::lp_model) macro to create a model with a fresh brand:
//!
//! ```rust
//! use cropplan::lp_model;
//! use cropplan::lp_solver::VariableType;
//!
//! let mut model1 = lp_model!();
//! let mut model2 = lp_model!();
//!
//! let x = model1.add_variable("x", VariableType::Continuous, 0.0, 10.0).unwrap();
//! let y = model2.add_variable("y", VariableType::Continuous, 0.0, 10.0).unwrap();
//!
//! // let _mixed = x + y;  // ERROR: different brands
//! # let _ = (x, y);
//! ```
//!
//! # Building Models
//!
//! Variables are usually allocated in bulk through a [`VariableCollection`] indexed by
//! domain keys. Constraints are bounded linear expressions `lo <= expr <= hi`; the
//! [`constraint!`](crate::constraint) macro gives them comparison syntax:
//!
//! ```rust
//! use cropplan::{constraint, lp_model};
//! use cropplan::lp_solver::{Constraint, Objective, VariableType};
//!
//! let mut model = lp_model!();
//! let x = model.add_variable("x", VariableType::Binary, 0.0, 1.0).unwrap();
//! let y = model.add_variable("y", VariableType::Binary, 0.0, 1.0).unwrap();
//!
//! model.add_constraint(constraint!((x + y) <= 1.0)).unwrap();
//! model.add_constraint(Constraint::ge(2.0 * x - y, 0.0).named("prefer_x")).unwrap();
//!
//! // If x is planted, y must not be
//! let rule = Constraint::eq(x, 1.0).implies(Constraint::eq(y, 0.0));
//! model.add_implication(rule).unwrap();
//!
//! model.add_objective(Objective::maximize(x + y)).unwrap();
//! ```
//!
//! # Solving
//!
//! [`Model::solve`] picks a backend from the `CROPPLAN_LP_SOLVER` environment variable:
//! - `"gurobi"` - Gurobi (requires the `gurobi` feature)
//! - `"coin_cbc"` - COIN-OR CBC linked in-process (requires the `coin_cbc` feature)
//! - `"cbc-cli"` - an external `cbc` executable fed with an LP file
//!
//! If not set, Gurobi is preferred when available, then in-process CBC, then the
//! external executable. Solved values are copied back with
//! [`Model::apply_solution`] and read through [`Model::value`] or
//! [`VariableCollection::value`].

use std::env;
use std::fmt;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use tracing::{debug, info, warn};

// Macros for convenient syntax
pub mod macros;

// Operator overloading for linear expressions
pub mod ops;

pub mod cbc_cli;
pub mod collection;
mod error;
pub mod implication;
pub mod lp_format;
mod names;
pub mod problem;

#[cfg(feature = "gurobi")]
pub mod gurobi;

#[cfg(feature = "coin_cbc")]
pub mod coin_cbc;

#[cfg(feature = "coin_cbc")]
mod output_suppression;

pub use collection::VariableCollection;
pub use error::ModelError;
pub use implication::{Antecedent, Implication, ImplicationCompiler};
pub use names::{NamingStyle, sanitize};
pub use problem::{
    Column, LpSolver, Problem, RawSolution, Row, SolveOptions, SolveStatus, Solution,
};

/// Tolerance used when snapping integral columns and checking constraints
pub const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// Variable types supported by LP solvers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    /// Continuous variable (can take any real value)
    Continuous,
    /// Integer variable (can only take integer values)
    Integer,
    /// Binary variable (can only take values 0 or 1)
    Binary,
}

impl VariableType {
    pub fn is_integral(self) -> bool {
        !matches!(self, VariableType::Continuous)
    }
}

/// Optimization direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationSense {
    /// Minimize the objective function
    Minimize,
    /// Maximize the objective function
    Maximize,
}

/// Available LP solver backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverBackend {
    #[cfg(feature = "gurobi")]
    /// Gurobi commercial solver
    Gurobi,
    #[cfg(feature = "coin_cbc")]
    /// Coin CBC open-source solver, linked in-process
    CoinCbc,
    /// External `cbc` executable driven through an LP file
    CbcCli,
}

impl SolverBackend {
    /// Get the solver backend from environment variable or use fallback logic
    #[allow(unreachable_code)]
    pub fn from_env_or_default() -> Result<Self> {
        if let Ok(solver_name) = env::var("CROPPLAN_LP_SOLVER") {
            match solver_name.to_lowercase().as_str() {
                "gurobi" => {
                    #[cfg(feature = "gurobi")]
                    return Ok(SolverBackend::Gurobi);
                    #[cfg(not(feature = "gurobi"))]
                    return Err(anyhow!(
                        "Gurobi solver requested via CROPPLAN_LP_SOLVER but gurobi feature not enabled"
                    ));
                }
                "coin_cbc" | "coin-cbc" => {
                    #[cfg(feature = "coin_cbc")]
                    return Ok(SolverBackend::CoinCbc);
                    #[cfg(not(feature = "coin_cbc"))]
                    return Err(anyhow!(
                        "Coin CBC solver requested via CROPPLAN_LP_SOLVER but coin_cbc feature not enabled"
                    ));
                }
                "cbc-cli" | "cbc_cli" => return Ok(SolverBackend::CbcCli),
                _ => {
                    return Err(anyhow!(
                        "Invalid solver '{}' in CROPPLAN_LP_SOLVER. Valid options: gurobi, coin_cbc, cbc-cli",
                        solver_name
                    ));
                }
            }
        }

        // Fallback logic: prefer gurobi if available, then coin_cbc, then the executable
        #[cfg(feature = "gurobi")]
        return Ok(SolverBackend::Gurobi);

        #[cfg(feature = "coin_cbc")]
        return Ok(SolverBackend::CoinCbc);

        Ok(SolverBackend::CbcCli)
    }

    /// Instantiate the backend
    pub fn solver(self) -> Box<dyn LpSolver> {
        match self {
            #[cfg(feature = "gurobi")]
            SolverBackend::Gurobi => Box::new(gurobi::GurobiSolver),
            #[cfg(feature = "coin_cbc")]
            SolverBackend::CoinCbc => Box::new(coin_cbc::CoinCbcSolver),
            SolverBackend::CbcCli => Box::new(cbc_cli::CbcCommand::from_env()),
        }
    }
}

/// A linear expression term: coefficient * variable
pub struct LinearTerm<Brand> {
    pub coefficient: f64,
    pub variable: VariableId<Brand>,
}

impl<Brand> Clone for LinearTerm<Brand> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Brand> Copy for LinearTerm<Brand> {}

impl<Brand> fmt::Debug for LinearTerm<Brand> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} * #{}", self.coefficient, self.variable.id)
    }
}

/// A linear expression: sum of terms plus constant
///
/// Each variable appears at most once; combining expressions sums the coefficients
/// of shared variables and drops terms whose coefficient cancels to zero. Terms
/// keep the order in which their variable first appeared.
pub struct LinearExpression<Brand> {
    terms: Vec<LinearTerm<Brand>>,
    constant: f64,
}

impl<Brand> LinearExpression<Brand> {
    /// Create a new linear expression with a constant term
    pub fn new(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    /// The empty sum
    pub fn zero() -> Self {
        Self::new(0.0)
    }

    /// Create a linear expression from a single variable
    pub fn from_variable(variable: VariableId<Brand>) -> Self {
        Self {
            terms: vec![LinearTerm {
                coefficient: 1.0,
                variable,
            }],
            constant: 0.0,
        }
    }

    pub fn terms(&self) -> &[LinearTerm<Brand>] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// True when no variable is referenced
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Coefficient of `variable`, zero when absent
    pub fn coefficient(&self, variable: VariableId<Brand>) -> f64 {
        self.terms
            .iter()
            .find(|term| term.variable == variable)
            .map_or(0.0, |term| term.coefficient)
    }

    pub fn variables(&self) -> impl Iterator<Item = VariableId<Brand>> + '_ {
        self.terms.iter().map(|term| term.variable)
    }

    /// Return a new expression with `coefficient * variable` added
    pub fn with_term(mut self, coefficient: f64, variable: VariableId<Brand>) -> Self {
        self.add_term(coefficient, variable);
        self
    }

    /// Value of the expression under the given assignment
    pub fn evaluate(&self, value_of: impl Fn(VariableId<Brand>) -> f64) -> f64 {
        self.terms
            .iter()
            .map(|term| term.coefficient * value_of(term.variable))
            .sum::<f64>()
            + self.constant
    }

    /// Merge a term into the expression
    pub(crate) fn add_term(&mut self, coefficient: f64, variable: VariableId<Brand>) {
        match self.terms.iter().position(|term| term.variable == variable) {
            Some(pos) => {
                self.terms[pos].coefficient += coefficient;
                if self.terms[pos].coefficient == 0.0 {
                    self.terms.remove(pos);
                }
            }
            None if coefficient != 0.0 => self.terms.push(LinearTerm {
                coefficient,
                variable,
            }),
            None => {}
        }
    }
}

impl<Brand> Clone for LinearExpression<Brand> {
    fn clone(&self) -> Self {
        Self {
            terms: self.terms.clone(),
            constant: self.constant,
        }
    }
}

impl<Brand> fmt::Debug for LinearExpression<Brand> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearExpression")
            .field("terms", &self.terms)
            .field("constant", &self.constant)
            .finish()
    }
}

impl<Brand> From<VariableId<Brand>> for LinearExpression<Brand> {
    fn from(variable: VariableId<Brand>) -> Self {
        Self::from_variable(variable)
    }
}

impl<Brand> From<f64> for LinearExpression<Brand> {
    fn from(constant: f64) -> Self {
        Self::new(constant)
    }
}

/// Unique identifier for a variable in the model
///
/// The `Brand` type parameter ensures that variables can only be used with the
/// model that created them. This is enforced at compile time.
pub struct VariableId<Brand> {
    id: usize,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> VariableId<Brand> {
    fn new(id: usize) -> Self {
        Self {
            id,
            _brand: PhantomData,
        }
    }

    /// Position of the variable in [`Model::variables`]
    pub fn index(&self) -> usize {
        self.id
    }
}

// Manual trait implementations that don't require Brand to implement anything
impl<Brand> fmt::Debug for VariableId<Brand> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableId").field("id", &self.id).finish()
    }
}

impl<Brand> Clone for VariableId<Brand> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Brand> Copy for VariableId<Brand> {}

impl<Brand> PartialEq for VariableId<Brand> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<Brand> Eq for VariableId<Brand> {}

impl<Brand> std::hash::Hash for VariableId<Brand> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Unique identifier for a constraint in the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(usize);

impl ConstraintId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A bounded linear constraint `lower <= expression <= upper`
///
/// Equalities have `lower == upper`; one-sided inequalities use an infinite bound.
/// Building a constraint never compares anything, it only describes a rule for the
/// solver.
///
/// # Examples
///
/// ```rust
/// use cropplan::{constraint, lp_model};
/// use cropplan::lp_solver::{Constraint, VariableType};
///
/// let mut model = lp_model!();
/// let x = model.add_variable("x", VariableType::Continuous, 0.0, 10.0).unwrap();
/// let y = model.add_variable("y", VariableType::Continuous, 0.0, 10.0).unwrap();
///
/// // Using the constraint! macro
/// let c = constraint!((x + y) == 10.0);
///
/// // Using builder functions
/// let c = Constraint::eq(x + y, 10.0);
/// let c = Constraint::between(x - y, -2.0, 2.0).named("spread");
/// ```
pub struct Constraint<Brand> {
    name: Option<Arc<str>>,
    expression: LinearExpression<Brand>,
    lower: f64,
    upper: f64,
}

impl<Brand> Constraint<Brand> {
    /// Create a new constraint `lower <= expression <= upper`
    pub fn new(expression: impl Into<LinearExpression<Brand>>, lower: f64, upper: f64) -> Self {
        Self {
            name: None,
            expression: expression.into(),
            lower,
            upper,
        }
    }

    /// Create an equality constraint: expression == rhs
    pub fn eq(expression: impl Into<LinearExpression<Brand>>, rhs: f64) -> Self {
        Self::new(expression, rhs, rhs)
    }

    /// Create a less-than-or-equal constraint: expression <= rhs
    pub fn le(expression: impl Into<LinearExpression<Brand>>, rhs: f64) -> Self {
        Self::new(expression, f64::NEG_INFINITY, rhs)
    }

    /// Create a greater-than-or-equal constraint: expression >= rhs
    pub fn ge(expression: impl Into<LinearExpression<Brand>>, rhs: f64) -> Self {
        Self::new(expression, rhs, f64::INFINITY)
    }

    /// Create a ranged constraint: lower <= expression <= upper
    pub fn between(expression: impl Into<LinearExpression<Brand>>, lower: f64, upper: f64) -> Self {
        Self::new(expression, lower, upper)
    }

    /// Attach a name, used for export and debugging
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn expression(&self) -> &LinearExpression<Brand> {
        &self.expression
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn is_equality(&self) -> bool {
        self.lower == self.upper
    }

    /// Check the constraint against an assignment
    pub fn is_satisfied(&self, value_of: impl Fn(VariableId<Brand>) -> f64, tolerance: f64) -> bool {
        let value = self.expression.evaluate(value_of);
        value >= self.lower - tolerance && value <= self.upper + tolerance
    }

    /// Build the rule "if `self` holds then `consequent` holds"
    pub fn implies(self, consequent: Constraint<Brand>) -> Implication<Brand> {
        Implication::new(self, consequent)
    }
}

impl<Brand> Clone for Constraint<Brand> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            expression: self.expression.clone(),
            lower: self.lower,
            upper: self.upper,
        }
    }
}

impl<Brand> fmt::Debug for Constraint<Brand> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .field("expression", &self.expression)
            .field("lower", &self.lower)
            .field("upper", &self.upper)
            .finish()
    }
}

/// Variable information stored in the model
#[derive(Debug, Clone)]
pub struct VariableInfo {
    name: Arc<str>,
    export_name: String,
    var_type: VariableType,
    lower_bound: f64,
    upper_bound: f64,
    collection: Option<usize>,
    value: Option<f64>,
}

impl VariableInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name handed to the solver, see [`NamingStyle`]
    pub fn export_name(&self) -> &str {
        &self.export_name
    }

    pub fn var_type(&self) -> VariableType {
        self.var_type
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    /// Solved value, `None` while unresolved
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// A binary variable whose bounds still allow both 0 and 1
    pub fn is_free_binary(&self) -> bool {
        self.var_type == VariableType::Binary && self.lower_bound <= 0.0 && self.upper_bound >= 1.0
    }
}

/// Objective function: an expression and a direction
pub struct Objective<Brand> {
    name: Option<Arc<str>>,
    expression: LinearExpression<Brand>,
    sense: OptimizationSense,
}

impl<Brand> Objective<Brand> {
    pub fn new(expression: impl Into<LinearExpression<Brand>>, sense: OptimizationSense) -> Self {
        Self {
            name: None,
            expression: expression.into(),
            sense,
        }
    }

    pub fn maximize(expression: impl Into<LinearExpression<Brand>>) -> Self {
        Self::new(expression, OptimizationSense::Maximize)
    }

    pub fn minimize(expression: impl Into<LinearExpression<Brand>>) -> Self {
        Self::new(expression, OptimizationSense::Minimize)
    }

    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn expression(&self) -> &LinearExpression<Brand> {
        &self.expression
    }

    pub fn sense(&self) -> OptimizationSense {
        self.sense
    }
}

/// Model-wide settings, fixed when the model is created
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelConfig {
    pub naming_style: NamingStyle,
    /// Report values for variables that no constraint or objective references
    pub track_removed_variables: bool,
    /// Fallback big-M for implications whose consequent has unbounded variables
    pub big_m: Option<f64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            naming_style: NamingStyle::UniqueLongNames,
            track_removed_variables: true,
            big_m: None,
        }
    }
}

/// A named group of variables registered with a model
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    name: Arc<str>,
    indices: Vec<usize>,
}

impl CollectionInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// A mixed-integer linear model
///
/// Owns every variable, constraint and the objective. Construction is
/// append-only; after solving, the model is only touched again to write solved
/// values back with [`Model::apply_solution`].
///
/// # Examples
///
/// ```rust
/// use cropplan::lp_solver::{Model, ModelConfig, NamingStyle, VariableType};
///
/// struct Planting;
/// let config = ModelConfig {
///     naming_style: NamingStyle::ShortNames,
///     ..ModelConfig::default()
/// };
/// let mut model = Model::<Planting>::with_config(config);
/// let x = model.add_variable("x", VariableType::Binary, 0.0, 1.0).unwrap();
/// assert_eq!(model.variable(x).unwrap().export_name(), "x0");
/// ```
pub struct Model<Brand> {
    config: ModelConfig,
    variables: Vec<VariableInfo>,
    column_names: names::NameRegistry,
    constraints: Vec<Constraint<Brand>>,
    row_names: Vec<String>,
    row_registry: names::NameRegistry,
    collections: Vec<CollectionInfo>,
    collection_names: names::NameRegistry,
    objective: Option<Objective<Brand>>,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> Model<Brand> {
    /// Create an empty model with the default configuration
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    pub fn with_config(config: ModelConfig) -> Self {
        Self {
            config,
            variables: Vec::new(),
            column_names: names::NameRegistry::new(config.naming_style, 'x'),
            constraints: Vec::new(),
            row_names: Vec::new(),
            row_registry: names::NameRegistry::new(config.naming_style, 'c'),
            collections: Vec::new(),
            collection_names: names::NameRegistry::new(NamingStyle::ShortNames, 'v'),
            objective: None,
            _brand: PhantomData,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Add a single named variable to the model
    pub fn add_variable(
        &mut self,
        name: &str,
        var_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<VariableId<Brand>, ModelError> {
        let ids = self.push_variables(
            vec![(Arc::from(name), var_type, lower_bound, upper_bound)],
            None,
        )?;
        Ok(ids[0])
    }

    /// Register a batch of variables, all or nothing
    fn push_variables(
        &mut self,
        specs: Vec<(Arc<str>, VariableType, f64, f64)>,
        collection: Option<usize>,
    ) -> Result<Vec<VariableId<Brand>>, ModelError> {
        let mut bounded = Vec::with_capacity(specs.len());
        for (name, var_type, lower, upper) in specs {
            let (lower, upper) = match var_type {
                VariableType::Binary => (lower.max(0.0), upper.min(1.0)),
                _ => (lower, upper),
            };
            if !(lower <= upper) {
                return Err(ModelError::InvertedBounds {
                    name: name.to_string(),
                    lower,
                    upper,
                });
            }
            bounded.push((name, var_type, lower, upper));
        }

        let names: Vec<Arc<str>> = bounded.iter().map(|(name, ..)| name.clone()).collect();
        let first = self.variables.len();
        let exports = self.column_names.register_all(&names, first)?;

        let mut ids = Vec::with_capacity(bounded.len());
        for ((name, var_type, lower_bound, upper_bound), export_name) in
            bounded.into_iter().zip(exports)
        {
            ids.push(VariableId::new(self.variables.len()));
            self.variables.push(VariableInfo {
                name,
                export_name,
                var_type,
                lower_bound,
                upper_bound,
                collection,
                value: None,
            });
        }
        Ok(ids)
    }

    /// Register a collection name and its variables
    pub(crate) fn push_collection(
        &mut self,
        name: &str,
        specs: Vec<(Arc<str>, VariableType, f64, f64)>,
    ) -> Result<Vec<VariableId<Brand>>, ModelError> {
        let name: Arc<str> = Arc::from(name);
        let index = self.collections.len();

        // Check the collection name without keeping it if the variables fail
        let mut collection_names = self.collection_names.clone();
        collection_names.register(name.clone(), index)?;
        let ids = self.push_variables(specs, Some(index))?;
        self.collection_names = collection_names;

        self.collections.push(CollectionInfo {
            name,
            indices: ids.iter().map(|id| id.id).collect(),
        });
        Ok(ids)
    }

    pub fn variable(&self, variable: VariableId<Brand>) -> Option<&VariableInfo> {
        self.variables.get(variable.id)
    }

    pub fn variables(&self) -> &[VariableInfo] {
        &self.variables
    }

    /// Every registered collection, in creation order
    pub fn variable_collections(&self) -> &[CollectionInfo] {
        &self.collections
    }

    /// Variables belonging to a registered collection
    pub fn collection_variables<'a>(
        &'a self,
        collection: &'a CollectionInfo,
    ) -> impl Iterator<Item = &'a VariableInfo> + 'a {
        collection.indices.iter().map(|&i| &self.variables[i])
    }

    fn check_expression(&self, expression: &LinearExpression<Brand>) -> Result<(), ModelError> {
        match expression
            .terms
            .iter()
            .find(|term| term.variable.id >= self.variables.len())
        {
            Some(term) => Err(ModelError::UnknownVariable(term.variable.id)),
            None => Ok(()),
        }
    }

    /// Add a constraint to the model
    pub fn add_constraint(&mut self, constraint: Constraint<Brand>) -> Result<ConstraintId, ModelError> {
        let index = self.constraints.len();
        if !(constraint.lower <= constraint.upper) {
            return Err(ModelError::InvertedBounds {
                name: constraint
                    .name
                    .as_deref()
                    .map_or_else(|| format!("constraint #{}", index), str::to_string),
                lower: constraint.lower,
                upper: constraint.upper,
            });
        }
        self.check_expression(&constraint.expression)?;

        // Ranged rows are written out as two halves named `<name>_lo` and `<name>_hi`
        let ranged = constraint.lower.is_finite()
            && constraint.upper.is_finite()
            && constraint.lower != constraint.upper;
        let name = match &constraint.name {
            Some(name) => name.clone(),
            None => self.row_registry.fresh_row_name("_c", index, ranged),
        };
        let export = self.row_registry.register_row(name, index, ranged)?;

        self.row_names.push(export);
        self.constraints.push(constraint);
        Ok(ConstraintId(index))
    }

    /// Compile an implication and add the resulting constraints
    ///
    /// Only the compiled constraints are kept; the implication itself is consumed.
    pub fn add_implication(
        &mut self,
        implication: Implication<Brand>,
    ) -> Result<Vec<ConstraintId>, ModelError> {
        let compiler = ImplicationCompiler {
            big_m: self.config.big_m,
        };
        let compiled = compiler.compile(self, &implication)?;
        compiled
            .into_iter()
            .map(|constraint| self.add_constraint(constraint))
            .collect()
    }

    /// Set the objective function; a model has at most one
    pub fn add_objective(&mut self, objective: Objective<Brand>) -> Result<(), ModelError> {
        if self.objective.is_some() {
            return Err(ModelError::MultipleObjectives);
        }
        self.check_expression(&objective.expression)?;
        self.objective = Some(objective);
        Ok(())
    }

    pub fn objective(&self) -> Option<&Objective<Brand>> {
        self.objective.as_ref()
    }

    /// Constraints in insertion order
    pub fn constraints(&self) -> &[Constraint<Brand>] {
        &self.constraints
    }

    /// Solver-facing name of a constraint
    pub fn constraint_export_name(&self, constraint: ConstraintId) -> &str {
        &self.row_names[constraint.0]
    }

    /// Write the model in CPLEX LP format
    pub fn write_lp(&self, writer: &mut dyn Write) -> io::Result<()> {
        lp_format::write_lp(&self.to_problem(), writer)
    }

    /// Solve the model with the backend selected by `CROPPLAN_LP_SOLVER`
    pub fn solve(&self) -> Result<Solution> {
        let backend = SolverBackend::from_env_or_default()?;
        self.solve_with(backend.solver().as_ref(), &SolveOptions::default())
    }

    /// Solve the model with an explicit backend
    ///
    /// `Err` means the solve could not run. Infeasible, unbounded or timed-out
    /// outcomes are reported through [`Solution::status`].
    pub fn solve_with(&self, solver: &dyn LpSolver, options: &SolveOptions) -> Result<Solution> {
        let problem = self.to_problem();

        info!(
            event = "solve_start",
            backend = solver.name(),
            columns = problem.columns.len(),
            rows = problem.rows.len(),
        );

        let raw = if let Some(row) = &problem.violated_row {
            debug!(row = %row, "constant constraint is violated, skipping backend");
            RawSolution::status_only(SolveStatus::Infeasible)
        } else if problem.columns.is_empty() {
            RawSolution {
                status: SolveStatus::Optimal,
                objective_value: Some(problem.objective_constant),
                values: Vec::new(),
            }
        } else {
            solver.solve(&problem, options)?
        };

        let solution = self.solution_from_raw(&problem, raw)?;

        info!(
            event = "solve_end",
            status = %solution.status,
            objective = ?solution.objective_value,
        );
        Ok(solution)
    }

    fn solution_from_raw(&self, problem: &Problem, raw: RawSolution) -> Result<Solution> {
        if !raw.status.has_values() {
            return Ok(Solution::new(raw.status, None, Vec::new()));
        }
        if raw.values.len() != problem.columns.len() {
            bail!(
                "solver returned {} values for {} columns",
                raw.values.len(),
                problem.columns.len()
            );
        }

        let mut values = Vec::with_capacity(self.variables.len());
        for (column, &value) in problem.columns.iter().zip(&raw.values) {
            let value = if column.var_type.is_integral()
                && (value - value.round()).abs() < INTEGRALITY_TOLERANCE
            {
                value.round()
            } else {
                value
            };
            values.push((column.variable, value));
        }

        if self.config.track_removed_variables {
            values.extend(
                problem
                    .removed
                    .iter()
                    .filter_map(|&index| resting_value(&self.variables[index]).map(|value| (index, value))),
            );
        } else if !problem.removed.is_empty() {
            debug!(
                removed = problem.removed.len(),
                "unreferenced variables left out of the solution"
            );
        }

        let objective_value = match &self.objective {
            Some(objective) => {
                let mut by_index = vec![None; self.variables.len()];
                for &(index, value) in &values {
                    by_index[index] = Some(value);
                }
                let complete = objective
                    .expression
                    .variables()
                    .all(|var| by_index[var.id].is_some());
                if complete {
                    Some(objective.expression.evaluate(|var| by_index[var.id].unwrap_or(0.0)))
                } else {
                    raw.objective_value
                }
            }
            None => Some(0.0),
        };

        Ok(Solution::new(
            raw.status,
            objective_value,
            values
                .into_iter()
                .map(|(index, value)| (self.variables[index].name.to_string(), value)),
        ))
    }

    /// Copy solved values onto every variable of the model
    ///
    /// Variables missing from the solution, and all variables when the status
    /// carries no values, become unresolved. Returns the number of resolved variables.
    pub fn apply_solution(&mut self, solution: &Solution) -> usize {
        let mut resolved = 0;
        for info in &self.collections {
            for &index in &info.indices {
                let var = &mut self.variables[index];
                var.value = solution.value(&var.name);
                resolved += var.value.is_some() as usize;
            }
        }
        for var in self.variables.iter_mut().filter(|var| var.collection.is_none()) {
            var.value = solution.value(&var.name);
            resolved += var.value.is_some() as usize;
        }

        let unresolved = self.variables.len() - resolved;
        if solution.status.has_values() && unresolved > 0 {
            warn!(unresolved, "variables left unresolved after write-back");
        }
        resolved
    }

    /// Solved value of a variable, `None` while unresolved
    pub fn value(&self, variable: VariableId<Brand>) -> Option<f64> {
        self.variables.get(variable.id).and_then(|var| var.value)
    }

    pub(crate) fn set_value(&mut self, variable: VariableId<Brand>, value: Option<f64>) {
        if let Some(var) = self.variables.get_mut(variable.id) {
            var.value = value;
        }
    }
}

impl<Brand> Default for Model<Brand> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-bounds value closest to zero, used for variables no row references
///
/// `None` for integral variables whose bounds hold no integer.
fn resting_value(var: &VariableInfo) -> Option<f64> {
    let (lower, upper) = if var.var_type.is_integral() {
        (var.lower_bound.ceil(), var.upper_bound.floor())
    } else {
        (var.lower_bound, var.upper_bound)
    };
    (lower <= upper).then(|| 0.0_f64.clamp(lower, upper))
}
