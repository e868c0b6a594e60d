//! Structural subtyping
//!
//! `t <: s` holds when every value of `t` can stand in for a value of `s`.
//! The relation is coinductive: recursive types are handled by assuming a
//! pair holds while its components are being checked, so the check
//! terminates on any pair of (finite) type graphs.
//!
//! The checker carries two environments because the decoder compares a
//! wire-side type table against receiver-side definitions; names on each
//! side resolve in their own environment. Plain same-environment checks
//! pass the one environment twice.

use rustc_hash::FxHashSet;

use crate::env::TypeEnv;
use crate::error::TypeError;
use crate::ty::{Field, FuncType, Type};

/// A coinductive subtype checker over a pair of type environments.
pub struct SubtypeChecker<'a> {
    /// `envs[0]` resolves names on the left of the relation, `envs[1]`
    /// on the right. Contravariant positions flip both sides and the
    /// environments with them.
    envs: [&'a TypeEnv; 2],
    /// Pairs currently assumed to hold, keyed before name resolution.
    /// The flag records which orientation of the environments applies.
    seen: FxHashSet<(Type, Type, bool)>,
    /// False once the environments have been flipped an odd number of
    /// times on the path to the current pair.
    forward: bool,
}

impl<'a> SubtypeChecker<'a> {
    /// Checker for two types resolving in the same environment.
    pub fn new(env: &'a TypeEnv) -> Self {
        Self::with_envs(env, env)
    }

    /// Checker where the left type resolves in `left` and the right in
    /// `right`.
    pub fn with_envs(left: &'a TypeEnv, right: &'a TypeEnv) -> Self {
        SubtypeChecker {
            envs: [left, right],
            seen: FxHashSet::default(),
            forward: true,
        }
    }

    fn left_env(&self) -> &'a TypeEnv {
        if self.forward {
            self.envs[0]
        } else {
            self.envs[1]
        }
    }

    fn right_env(&self) -> &'a TypeEnv {
        if self.forward {
            self.envs[1]
        } else {
            self.envs[0]
        }
    }

    /// Check `a <: b` in a contravariant position: sides and
    /// environments swap for the duration of the call.
    fn subtype_flipped(&mut self, a: &Type, b: &Type) -> Result<bool, TypeError> {
        self.forward = !self.forward;
        let r = self.subtype(a, b);
        self.forward = !self.forward;
        r
    }

    /// Does `a <: b` hold?
    ///
    /// Errors only on unbound type names; a failed check is `Ok(false)`.
    pub fn subtype(&mut self, a: &Type, b: &Type) -> Result<bool, TypeError> {
        if a == b {
            return Ok(true);
        }
        let key = (a.clone(), b.clone(), self.forward);
        if matches!(a, Type::Var(_)) || matches!(b, Type::Var(_)) {
            if !self.seen.insert(key.clone()) {
                // Already assumed on this path; coinduction says yes.
                return Ok(true);
            }
            let a = self.left_env().trans(a)?.clone();
            let b = self.right_env().trans(b)?.clone();
            let r = self.subtype(&a, &b);
            if !matches!(r, Ok(true)) {
                self.seen.remove(&key);
            }
            return r;
        }

        let r = match (a, b) {
            (Type::Empty, _) => true,
            (_, Type::Reserved) => true,
            // Any type may be promoted to an optional on upgrade.
            (_, Type::Opt(_)) => true,
            (Type::Nat, Type::Int) => true,
            (Type::Blob, Type::Vec(e)) => *self.right_env().trans(e)? == Type::Nat8,
            (Type::Vec(e), Type::Blob) => *self.left_env().trans(e)? == Type::Nat8,
            (Type::Vec(ea), Type::Vec(eb)) => self.subtype(ea, eb)?,
            (Type::Record(fa), Type::Record(fb)) => self.record_subtype(fa, fb)?,
            (Type::Variant(fa), Type::Variant(fb)) => self.variant_subtype(fa, fb)?,
            (Type::Func(fa), Type::Func(fb)) => self.func_subtype(fa, fb)?,
            (Type::Service(ma), Type::Service(mb)) => self.service_subtype(ma, mb)?,
            _ => false,
        };
        Ok(r)
    }

    /// Width and depth subtyping on records: the subtype may carry extra
    /// fields, and a field the subtype lacks must be defaultable on the
    /// supertype side.
    fn record_subtype(&mut self, sub: &[Field], sup: &[Field]) -> Result<bool, TypeError> {
        for fb in sup {
            match Type::find_field(sub, fb.label.id()) {
                Some(fa) => {
                    if !self.subtype(&fa.ty, &fb.ty)? {
                        return Ok(false);
                    }
                }
                None => {
                    if !self.defaultable(self.right_env(), &fb.ty)? {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    /// Variant subtyping: every tag the subtype can produce must exist in
    /// the supertype at a compatible payload type.
    fn variant_subtype(&mut self, sub: &[Field], sup: &[Field]) -> Result<bool, TypeError> {
        for fa in sub {
            match Type::find_field(sup, fa.label.id()) {
                Some(fb) => {
                    if !self.subtype(&fa.ty, &fb.ty)? {
                        return Ok(false);
                    }
                }
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Function subtyping: parameters are contravariant, results
    /// covariant, and argument lists may grow with defaultable types.
    /// Modes must agree exactly.
    fn func_subtype(&mut self, sub: &FuncType, sup: &FuncType) -> Result<bool, TypeError> {
        if sub.modes != sup.modes {
            return Ok(false);
        }
        let mut args = sub.args.iter().zip_longest(&sup.args);
        for pair in &mut args {
            match pair {
                (Some(pa), Some(pb)) => {
                    if !self.subtype_flipped(pb, pa)? {
                        return Ok(false);
                    }
                }
                // The subtype declares a parameter callers of the
                // supertype will not send; it must be defaultable.
                (Some(pa), None) => {
                    if !self.defaultable(self.left_env(), pa)? {
                        return Ok(false);
                    }
                }
                // Callers sending extra arguments is always fine; the
                // callee ignores them.
                (None, Some(_)) => {}
                (None, None) => unreachable!(),
            }
        }
        let mut rets = sub.rets.iter().zip_longest(&sup.rets);
        for pair in &mut rets {
            match pair {
                (Some(ra), Some(rb)) => {
                    if !self.subtype(ra, rb)? {
                        return Ok(false);
                    }
                }
                // Extra results from the subtype are dropped by callers.
                (Some(_), None) => {}
                // A result the subtype does not produce must be
                // defaultable for the caller.
                (None, Some(rb)) => {
                    if !self.defaultable(self.right_env(), rb)? {
                        return Ok(false);
                    }
                }
                (None, None) => unreachable!(),
            }
        }
        Ok(true)
    }

    /// Service subtyping: every method of the supertype must exist in the
    /// subtype at a function subtype. Extra methods are fine.
    fn service_subtype(
        &mut self,
        sub: &[(String, Type)],
        sup: &[(String, Type)],
    ) -> Result<bool, TypeError> {
        for (name, tb) in sup {
            match sub.binary_search_by(|(n, _)| n.as_str().cmp(name)) {
                Ok(i) => {
                    let ta = sub[i].1.clone();
                    if !self.subtype(&ta, tb)? {
                        return Ok(false);
                    }
                }
                Err(_) => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Can a value of this type be conjured when the other side never
    /// sends one?
    fn defaultable(&self, env: &TypeEnv, ty: &Type) -> Result<bool, TypeError> {
        Ok(matches!(
            env.trans(ty)?,
            Type::Opt(_) | Type::Reserved | Type::Null
        ))
    }
}

/// Check `a <: b` with both types resolving in `env`.
pub fn subtype(env: &TypeEnv, a: &Type, b: &Type) -> Result<bool, TypeError> {
    SubtypeChecker::new(env).subtype(a, b)
}

/// Structural type equality up to name resolution.
///
/// Not the same as mutual subtyping: `nat <: opt nat` and
/// `opt nat <: opt nat` both hold, yet `nat` and `opt nat` are distinct.
pub fn equal(env_a: &TypeEnv, a: &Type, env_b: &TypeEnv, b: &Type) -> Result<bool, TypeError> {
    let mut seen = FxHashSet::default();
    equal_rec(env_a, a, env_b, b, &mut seen)
}

fn equal_rec(
    env_a: &TypeEnv,
    a: &Type,
    env_b: &TypeEnv,
    b: &Type,
    seen: &mut FxHashSet<(Type, Type)>,
) -> Result<bool, TypeError> {
    if matches!(a, Type::Var(_)) || matches!(b, Type::Var(_)) {
        let key = (a.clone(), b.clone());
        if !seen.insert(key.clone()) {
            return Ok(true);
        }
        let a = env_a.trans(a)?.clone();
        let b = env_b.trans(b)?.clone();
        let r = equal_rec(env_a, &a, env_b, &b, seen);
        if !matches!(r, Ok(true)) {
            seen.remove(&key);
        }
        return r;
    }
    let r = match (a, b) {
        (Type::Blob, Type::Vec(e)) => *env_b.trans(e)? == Type::Nat8,
        (Type::Vec(e), Type::Blob) => *env_a.trans(e)? == Type::Nat8,
        (Type::Opt(ia), Type::Opt(ib)) | (Type::Vec(ia), Type::Vec(ib)) => {
            equal_rec(env_a, ia, env_b, ib, seen)?
        }
        (Type::Record(fa), Type::Record(fb)) | (Type::Variant(fa), Type::Variant(fb)) => {
            fa.len() == fb.len() && {
                let mut ok = true;
                for (x, y) in fa.iter().zip(fb) {
                    if x.label.id() != y.label.id()
                        || !equal_rec(env_a, &x.ty, env_b, &y.ty, seen)?
                    {
                        ok = false;
                        break;
                    }
                }
                ok
            }
        }
        (Type::Func(fa), Type::Func(fb)) => {
            fa.modes == fb.modes
                && fa.args.len() == fb.args.len()
                && fa.rets.len() == fb.rets.len()
                && {
                    let mut ok = true;
                    for (x, y) in fa.args.iter().zip(&fb.args).chain(fa.rets.iter().zip(&fb.rets))
                    {
                        if !equal_rec(env_a, x, env_b, y, seen)? {
                            ok = false;
                            break;
                        }
                    }
                    ok
                }
        }
        (Type::Service(ma), Type::Service(mb)) => {
            ma.len() == mb.len() && {
                let mut ok = true;
                for ((na, ta), (nb, tb)) in ma.iter().zip(mb) {
                    if na != nb || !equal_rec(env_a, ta, env_b, tb, seen)? {
                        ok = false;
                        break;
                    }
                }
                ok
            }
        }
        _ => a == b,
    };
    Ok(r)
}

/// Pairwise iterator over two slices that keeps yielding after the
/// shorter side runs out.
trait ZipLongest<'s, T> {
    fn zip_longest(self, other: &'s [T]) -> ZipLongestIter<'s, T>;
}

impl<'s, T> ZipLongest<'s, T> for std::slice::Iter<'s, T> {
    fn zip_longest(self, other: &'s [T]) -> ZipLongestIter<'s, T> {
        ZipLongestIter {
            left: self,
            right: other.iter(),
        }
    }
}

struct ZipLongestIter<'s, T> {
    left: std::slice::Iter<'s, T>,
    right: std::slice::Iter<'s, T>,
}

impl<'s, T> Iterator for ZipLongestIter<'s, T> {
    type Item = (Option<&'s T>, Option<&'s T>);

    fn next(&mut self) -> Option<Self::Item> {
        match (self.left.next(), self.right.next()) {
            (None, None) => None,
            pair => Some(pair),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::{Label, FuncMode};

    fn field(name: &str, ty: Type) -> Field {
        Field {
            label: Label::Named(name.to_string()),
            ty,
        }
    }

    fn check(env: &TypeEnv, a: &Type, b: &Type) -> bool {
        subtype(env, a, b).unwrap()
    }

    #[test]
    fn test_primitive_rules() {
        let env = TypeEnv::new();
        assert!(check(&env, &Type::Nat, &Type::Int));
        assert!(!check(&env, &Type::Int, &Type::Nat));
        assert!(check(&env, &Type::Empty, &Type::Bool));
        assert!(check(&env, &Type::Text, &Type::Reserved));
        assert!(!check(&env, &Type::Nat8, &Type::Nat16));
    }

    #[test]
    fn test_anything_fits_an_opt() {
        let env = TypeEnv::new();
        let opt_text = Type::Opt(Box::new(Type::Text));
        assert!(check(&env, &Type::Nat, &opt_text));
        assert!(check(&env, &Type::Record(vec![]), &opt_text));
    }

    #[test]
    fn test_blob_is_vec_nat8() {
        let env = TypeEnv::new();
        let vec_nat8 = Type::Vec(Box::new(Type::Nat8));
        assert!(check(&env, &Type::Blob, &vec_nat8));
        assert!(check(&env, &vec_nat8, &Type::Blob));
        assert!(!check(&env, &Type::Blob, &Type::Vec(Box::new(Type::Nat16))));
    }

    #[test]
    fn test_record_width_and_depth() {
        let env = TypeEnv::new();
        let wide = Type::record(vec![
            field("a", Type::Nat),
            field("b", Type::Text),
        ]);
        let narrow = Type::record(vec![field("b", Type::Text)]);
        assert!(check(&env, &wide, &narrow));
        assert!(!check(&env, &narrow, &wide));
        // Missing field is fine when the supertype side is optional.
        let with_opt = Type::record(vec![
            field("b", Type::Text),
            field("c", Type::Opt(Box::new(Type::Nat))),
        ]);
        assert!(check(&env, &narrow, &with_opt));
        // Depth: nat <: int inside the field.
        let deep = Type::record(vec![field("a", Type::Nat)]);
        let deep_sup = Type::record(vec![field("a", Type::Int)]);
        assert!(check(&env, &deep, &deep_sup));
        assert!(!check(&env, &deep_sup, &deep));
    }

    #[test]
    fn test_variant_tags_may_grow_upward() {
        let env = TypeEnv::new();
        let small = Type::variant(vec![field("ok", Type::Nat)]);
        let big = Type::variant(vec![
            field("err", Type::Text),
            field("ok", Type::Nat),
        ]);
        assert!(check(&env, &small, &big));
        assert!(!check(&env, &big, &small));
    }

    #[test]
    fn test_func_contravariant_args() {
        let env = TypeEnv::new();
        let takes_int = Type::Func(FuncType::new(vec![Type::Int], vec![], vec![]));
        let takes_nat = Type::Func(FuncType::new(vec![Type::Nat], vec![], vec![]));
        assert!(check(&env, &takes_int, &takes_nat));
        assert!(!check(&env, &takes_nat, &takes_int));
    }

    #[test]
    fn test_func_arity_rules() {
        let env = TypeEnv::new();
        let plain = Type::Func(FuncType::new(vec![Type::Nat], vec![Type::Text], vec![]));
        let extra_opt_arg = Type::Func(FuncType::new(
            vec![Type::Nat, Type::Opt(Box::new(Type::Bool))],
            vec![Type::Text],
            vec![],
        ));
        let extra_nat_arg = Type::Func(FuncType::new(
            vec![Type::Nat, Type::Nat],
            vec![Type::Text],
            vec![],
        ));
        // New trailing opt parameter keeps old callers working.
        assert!(check(&env, &extra_opt_arg, &plain));
        assert!(!check(&env, &extra_nat_arg, &plain));
        // Extra results are dropped; a promised-but-missing result must
        // be defaultable.
        let extra_ret = Type::Func(FuncType::new(
            vec![Type::Nat],
            vec![Type::Text, Type::Nat],
            vec![],
        ));
        assert!(check(&env, &extra_ret, &plain));
        assert!(!check(&env, &plain, &extra_ret));
        let extra_opt_ret = Type::Func(FuncType::new(
            vec![Type::Nat],
            vec![Type::Text, Type::Opt(Box::new(Type::Nat))],
            vec![],
        ));
        assert!(check(&env, &plain, &extra_opt_ret));
    }

    #[test]
    fn test_func_modes_must_match() {
        let env = TypeEnv::new();
        let query = Type::Func(FuncType::new(vec![], vec![], vec![FuncMode::Query]));
        let update = Type::Func(FuncType::new(vec![], vec![], vec![]));
        assert!(!check(&env, &query, &update));
        assert!(!check(&env, &update, &query));
        assert!(check(&env, &query, &query));
    }

    #[test]
    fn test_service_methods_may_be_added() {
        let env = TypeEnv::new();
        let f = Type::Func(FuncType::new(vec![Type::Nat], vec![Type::Nat], vec![]));
        let one = Type::service(vec![("get".to_string(), f.clone())]);
        let two = Type::service(vec![
            ("get".to_string(), f.clone()),
            ("put".to_string(), f),
        ]);
        assert!(check(&env, &two, &one));
        assert!(!check(&env, &one, &two));
    }

    #[test]
    fn test_recursive_type_reflexive() {
        let mut env = TypeEnv::new();
        let list = Type::Opt(Box::new(Type::record(vec![
            field("head", Type::Int),
            field("tail", Type::Var("list".to_string())),
        ])));
        env.insert("list", list).unwrap();
        let t = Type::Var("list".to_string());
        assert!(check(&env, &t, &t));
    }

    #[test]
    fn test_recursive_widening() {
        // vec-headed lists, so the head field makes the direction
        // observable (an opt-headed list would absorb anything through
        // the option rule).
        let mut env = TypeEnv::new();
        let mk = |name: &str, head: Type| {
            Type::Vec(Box::new(Type::record(vec![
                field("head", head),
                field("rest", Type::Opt(Box::new(Type::Var(name.to_string())))),
            ])))
        };
        env.insert("natlist", mk("natlist", Type::Nat)).unwrap();
        env.insert("intlist", mk("intlist", Type::Int)).unwrap();
        assert!(check(
            &env,
            &Type::Var("natlist".to_string()),
            &Type::Var("intlist".to_string())
        ));
        assert!(!check(
            &env,
            &Type::Var("intlist".to_string()),
            &Type::Var("natlist".to_string())
        ));
    }

    #[test]
    fn test_opt_headed_recursion_widens_both_ways() {
        // When the list constructor itself is an opt, the option rule
        // accepts any subtype side, so both directions hold.
        let mut env = TypeEnv::new();
        let mk = |name: &str, head: Type| {
            Type::Opt(Box::new(Type::record(vec![
                field("head", head),
                field("tail", Type::Var(name.to_string())),
            ])))
        };
        env.insert("natlist", mk("natlist", Type::Nat)).unwrap();
        env.insert("intlist", mk("intlist", Type::Int)).unwrap();
        assert!(check(
            &env,
            &Type::Var("natlist".to_string()),
            &Type::Var("intlist".to_string())
        ));
        assert!(check(
            &env,
            &Type::Var("intlist".to_string()),
            &Type::Var("natlist".to_string())
        ));
    }

    #[test]
    fn test_equal_is_not_mutual_subtyping() {
        let env = TypeEnv::new();
        let opt_nat = Type::Opt(Box::new(Type::Nat));
        // nat <: opt nat and opt nat <: opt nat, yet they differ.
        assert!(check(&env, &Type::Nat, &opt_nat));
        assert!(!equal(&env, &Type::Nat, &env, &opt_nat).unwrap());
        assert!(equal(&env, &opt_nat, &env, &opt_nat).unwrap());
    }

    #[test]
    fn test_equal_across_environments() {
        let mut env_a = TypeEnv::new();
        let mut env_b = TypeEnv::new();
        let list_of = |name: &str| {
            Type::Opt(Box::new(Type::record(vec![
                field("head", Type::Int),
                field("tail", Type::Var(name.to_string())),
            ])))
        };
        env_a.insert("list", list_of("list")).unwrap();
        env_b.insert("lst", list_of("lst")).unwrap();
        assert!(equal(
            &env_a,
            &Type::Var("list".to_string()),
            &env_b,
            &Type::Var("lst".to_string())
        )
        .unwrap());
    }
}
