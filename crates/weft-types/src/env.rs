//! Named-type environment
//!
//! A `TypeEnv` owns every named type definition of a parsed interface.
//! Types reference each other by name (`Type::Var`), never by pointer, so
//! mutually recursive definitions stay finite graphs. An environment is
//! built once, validated, and read-only from then on.

use rustc_hash::FxHashMap;

use crate::error::TypeError;
use crate::ty::{Field, Type};

/// Mapping from type name to definition.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv(pub FxHashMap<String, Type>);

impl TypeEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        TypeEnv(FxHashMap::default())
    }

    /// Bind a name to a type. Rebinding an existing name is an error.
    pub fn insert(&mut self, name: &str, ty: Type) -> Result<(), TypeError> {
        if self.0.contains_key(name) {
            return Err(TypeError::DuplicateTypeName {
                name: name.to_string(),
            });
        }
        self.0.insert(name.to_string(), ty);
        Ok(())
    }

    /// Look up a name.
    pub fn find(&self, name: &str) -> Result<&Type, TypeError> {
        self.0.get(name).ok_or_else(|| TypeError::UnboundTypeName {
            name: name.to_string(),
        })
    }

    /// Resolve `Var` chains until a constructor is reached.
    ///
    /// Terminates on arbitrary (even unvalidated) input by tracking the
    /// names already seen; a pure alias cycle is a definition error.
    pub fn trans<'a>(&'a self, ty: &'a Type) -> Result<&'a Type, TypeError> {
        let mut t = ty;
        let mut seen: Vec<&str> = Vec::new();
        while let Type::Var(name) = t {
            if seen.iter().any(|s| s == name) {
                return Err(TypeError::NonProductiveCycle { name: name.clone() });
            }
            seen.push(name);
            t = self.find(name)?;
        }
        Ok(t)
    }

    /// Resolve a type expected to be a function type, e.g. a service method.
    pub fn as_func<'a>(&'a self, ty: &'a Type) -> Result<&'a crate::ty::FuncType, TypeError> {
        match self.trans(ty)? {
            Type::Func(f) => Ok(f),
            other => Err(TypeError::NotAFunction {
                method: other.to_string(),
            }),
        }
    }

    /// Check one type tree against this environment without following
    /// named references into their bodies (each binding is checked once by
    /// [`validate`](Self::validate)). Detects unbound names, duplicate
    /// labels, and service methods that do not resolve to functions.
    pub fn validate_type(&self, ty: &Type) -> Result<(), TypeError> {
        match ty {
            Type::Var(name) => {
                self.find(name)?;
                Ok(())
            }
            Type::Opt(t) | Type::Vec(t) => self.validate_type(t),
            Type::Record(fields) => self.validate_fields(fields, "record"),
            Type::Variant(fields) => self.validate_fields(fields, "variant"),
            Type::Func(func) => {
                for t in func.args.iter().chain(&func.rets) {
                    self.validate_type(t)?;
                }
                Ok(())
            }
            Type::Service(methods) => {
                for (name, ty) in methods {
                    self.validate_type(ty)?;
                    self.as_func(ty).map_err(|_| TypeError::NotAFunction {
                        method: name.clone(),
                    })?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn validate_fields(&self, fields: &[Field], kind: &'static str) -> Result<(), TypeError> {
        // Field lists are canonicalized ascending, so duplicates are adjacent.
        for pair in fields.windows(2) {
            if pair[0].label.id() == pair[1].label.id() {
                return Err(TypeError::DuplicateLabel {
                    kind,
                    id: pair[0].label.id(),
                });
            }
        }
        for field in fields {
            self.validate_type(&field.ty)?;
        }
        Ok(())
    }

    /// Validate the whole environment: every reference resolves, every
    /// alias chain reaches a constructor, and every definition is
    /// well-formed. Must be called once after construction; all later
    /// operations assume it passed.
    pub fn validate(&self) -> Result<(), TypeError> {
        for (name, ty) in &self.0 {
            // Productivity: following aliases from this name must not come
            // back to it before passing a constructor.
            self.trans(&Type::Var(name.clone()))?;
            self.validate_type(ty)?;
        }
        Ok(())
    }
}
