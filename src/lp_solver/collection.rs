//! Indexed groups of decision variables
//!
//! A [`VariableCollection`] allocates one variable per key of a declared index
//! domain, usually the Cartesian product of a few index sets such as days and
//! crops. Looking up a key outside that domain is an error, never a silently
//! created variable.
//!
//! ```rust
//! use cropplan::lp_model;
//! use cropplan::lp_solver::VariableType;
//! use itertools::iproduct;
//!
//! let mut model = lp_model!();
//! let days = 1..=3;
//! let crops = ["Crop A", "Crop B"];
//!
//! let plant = model
//!     .add_collection(
//!         "CropAssignment",
//!         iproduct!(days, crops),
//!         |(d, c)| format!("CropAssignment_{}_{}", d, c),
//!         |_| 0.0,
//!         |_| 1.0,
//!         |_| VariableType::Binary,
//!     )
//!     .unwrap();
//!
//! assert_eq!(plant.len(), 6);
//! assert!(plant.get(&(2, "Crop B")).is_ok());
//! assert!(plant.get(&(4, "Crop A")).is_err());
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Index;
use std::sync::Arc;

use tracing::debug;

use super::{LinearExpression, Model, ModelError, Solution, VariableId, VariableType};

/// Variables of one decision dimension, keyed by domain tuples
pub struct VariableCollection<Brand, K> {
    name: Arc<str>,
    keys: Vec<K>,
    variables: HashMap<K, VariableId<Brand>>,
}

impl<Brand> Model<Brand> {
    /// Allocate one variable per key of `domain`
    ///
    /// Names, bounds and kinds are computed per key by plain functions. The whole
    /// collection is validated before anything is registered: a name already used
    /// in the model fails with [`ModelError::DuplicateName`], a repeated key with
    /// [`ModelError::DuplicateKey`].
    pub fn add_collection<K, I, N, L, U, T>(
        &mut self,
        name: &str,
        domain: I,
        name_fn: N,
        lower_fn: L,
        upper_fn: U,
        kind_fn: T,
    ) -> Result<VariableCollection<Brand, K>, ModelError>
    where
        K: Eq + Hash + Clone + Debug,
        I: IntoIterator<Item = K>,
        N: Fn(&K) -> String,
        L: Fn(&K) -> f64,
        U: Fn(&K) -> f64,
        T: Fn(&K) -> VariableType,
    {
        let keys: Vec<K> = domain.into_iter().collect();

        let mut seen = HashMap::with_capacity(keys.len());
        for key in &keys {
            if seen.insert(key, ()).is_some() {
                return Err(ModelError::DuplicateKey {
                    collection: name.to_string(),
                    key: format!("{:?}", key),
                });
            }
        }

        let specs = keys
            .iter()
            .map(|key| {
                (
                    Arc::from(name_fn(key)),
                    kind_fn(key),
                    lower_fn(key),
                    upper_fn(key),
                )
            })
            .collect();
        let ids = self.push_collection(name, specs)?;

        debug!(collection = name, variables = ids.len(), "variable collection created");

        Ok(VariableCollection {
            name: Arc::from(name),
            variables: keys.iter().cloned().zip(ids).collect(),
            keys,
        })
    }
}

impl<Brand, K> VariableCollection<Brand, K>
where
    K: Eq + Hash + Debug,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in declaration order
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn contains(&self, key: &K) -> bool {
        self.variables.contains_key(key)
    }

    /// Variable for `key`, failing outside the declared domain
    pub fn get(&self, key: &K) -> Result<VariableId<Brand>, ModelError> {
        self.variables
            .get(key)
            .copied()
            .ok_or_else(|| ModelError::KeyNotFound {
                collection: self.name.to_string(),
                key: format!("{:?}", key),
            })
    }

    /// `(key, variable)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&K, VariableId<Brand>)> + '_ {
        self.keys.iter().map(move |key| (key, self.variables[key]))
    }

    /// Sum of the variables for the given keys
    pub fn sum_of<'k>(
        &self,
        keys: impl IntoIterator<Item = &'k K>,
    ) -> Result<LinearExpression<Brand>, ModelError>
    where
        K: 'k,
    {
        keys.into_iter().map(|key| self.get(key)).sum()
    }

    /// Sum of every variable in the collection
    pub fn total(&self) -> LinearExpression<Brand> {
        self.iter().map(|(_, var)| var).sum()
    }

    /// Copy solved values onto the variables of this collection
    ///
    /// Variables missing from the solution become unresolved rather than zero.
    /// Returns the number of variables that received a value.
    pub fn set_values(&self, model: &mut Model<Brand>, solution: &Solution) -> usize {
        let mut resolved = 0;
        for (_, var) in self.iter() {
            let value = model
                .variable(var)
                .and_then(|info| solution.value(info.name()));
            resolved += value.is_some() as usize;
            model.set_value(var, value);
        }
        resolved
    }

    /// Solved value for `key`, `None` while unresolved
    pub fn value(&self, model: &Model<Brand>, key: &K) -> Result<Option<f64>, ModelError> {
        Ok(model.value(self.get(key)?))
    }
}

impl<Brand, K> Index<&K> for VariableCollection<Brand, K>
where
    K: Eq + Hash + Debug,
{
    type Output = VariableId<Brand>;

    /// Panics outside the declared domain, use [`VariableCollection::get`] to
    /// handle that case.
    fn index(&self, key: &K) -> &Self::Output {
        match self.variables.get(key) {
            Some(var) => var,
            None => panic!("key {:?} is outside the domain of '{}'", key, self.name),
        }
    }
}

impl<Brand, K> std::fmt::Debug for VariableCollection<Brand, K>
where
    K: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableCollection")
            .field("name", &self.name)
            .field("keys", &self.keys)
            .finish()
    }
}
