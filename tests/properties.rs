use lumen::elab::*;
use proptest::prelude::*;

/// The shape of a term of type `Nat`; variables are resolved against whatever is in scope
#[derive(Debug, Clone)]
enum Shape {
    Lit(u8),
    Var(u8),
    Succ(Box<Shape>),
    Beta(Box<Shape>, Box<Shape>),
    Let(Box<Shape>, Box<Shape>),
    /// The scrutinee is a literal or an outer variable, so recursion stays shallow
    Elim(u8, Box<Shape>, Box<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![(0u8..4).prop_map(Shape::Lit), any::<u8>().prop_map(Shape::Var)];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(|x| Shape::Succ(Box::new(x))),
            (inner.clone(), inner.clone()).prop_map(|(b, x)| Shape::Beta(Box::new(b), Box::new(x))),
            (inner.clone(), inner.clone()).prop_map(|(v, b)| Shape::Let(Box::new(v), Box::new(b))),
            (any::<u8>(), inner.clone(), inner)
                .prop_map(|(n, z, s)| Shape::Elim(n, Box::new(z), Box::new(s))),
        ]
    })
}

fn nat() -> Term {
    Term::Prim(Prim::Nat)
}

/// Builds a term in a context of `size` variables, of which the ones at levels `free` may be used.
/// Levels below `base` are free in the whole term.
fn to_term(s: &Shape, free: &[u32], base: u32, size: u32) -> Term {
    let under = |n: u32| {
        let mut free = free.to_vec();
        free.extend(size..size + n);
        free
    };
    match s {
        Shape::Lit(n) => Term::NatLit(*n as u64),
        Shape::Var(i) if free.is_empty() => Term::NatLit(*i as u64 % 3),
        Shape::Var(i) => {
            let l = free[*i as usize % free.len()];
            Term::var(size - 1 - l)
        }
        Shape::Succ(x) => Term::Prim(Prim::Succ).app(Icit::Expl, to_term(x, free, base, size)),
        Shape::Beta(body, x) => Term::lam(Icit::Expl, "x", nat(), to_term(body, &under(1), base, size + 1))
            .app(Icit::Expl, to_term(x, free, base, size)),
        Shape::Let(v, body) => Term::Let(
            "y".into(),
            false,
            std::rc::Rc::new(nat()),
            std::rc::Rc::new(to_term(v, free, base, size)),
            std::rc::Rc::new(to_term(body, &under(1), base, size + 1)),
        ),
        Shape::Elim(n, z, step) => Term::PrimElim(
            PrimElim::Nat,
            std::rc::Rc::new(Term::lam(Icit::Expl, "_", nat(), nat())),
            std::rc::Rc::new({
                let outer: Vec<u32> = free.iter().copied().filter(|l| *l < base).collect();
                if *n % 2 == 0 || outer.is_empty() {
                    Term::NatLit(*n as u64 % 4)
                } else {
                    Term::var(size - 1 - outer[*n as usize % outer.len()])
                }
            }),
            vec![
                to_term(z, free, base, size),
                Term::lam(
                    Icit::Expl,
                    "m",
                    nat(),
                    Term::lam(Icit::Expl, "r", nat(), to_term(step, &under(2), base, size + 2)),
                ),
            ],
        ),
    }
}

/// An environment of `size` free variables
fn free_env(size: u32) -> Env {
    let mut env = Env::default();
    env.extend((0..size).map(|l| Val::var(Lvl::new(l))));
    env
}

proptest! {
    #[test]
    fn normalization_is_idempotent(s in shape(), size in 0u32..3) {
        let mcxt = MetaCxt::new();
        let env = free_env(size);
        let free: Vec<u32> = (0..size).collect();
        let t = to_term(&s, &free, size, size);
        let nf = t.normalize(&env, true, &mcxt);
        prop_assert_eq!(nf.normalize(&env, true, &mcxt), nf.clone());
        if size == 0 {
            prop_assert!(matches!(nf, Term::NatLit(_)));
        }
    }

    #[test]
    fn rollback_restores_everything(ops in prop::collection::vec((0u8..3, 0usize..8), 0..16)) {
        let mut mcxt = MetaCxt::new();
        let metas: Vec<Meta> = (0..4).map(|_| mcxt.fresh_meta()).collect();
        mcxt.set(metas[0], Val::NatLit(0)).unwrap();
        let before = mcxt.observe();

        mcxt.push();
        let mut live = metas.clone();
        for (op, i) in ops {
            let m = live[i % live.len()];
            match op {
                0 => live.push(mcxt.fresh_meta()),
                1 => {
                    if !mcxt.is_solved(m) {
                        mcxt.set(m, Val::Type).unwrap();
                    }
                }
                _ => mcxt.postpone(m, Problem { size: Size::zero(), lhs: Val::Type, rhs: Val::meta(m) }),
            }
        }
        mcxt.pop();

        prop_assert_eq!(mcxt.observe(), before);
        prop_assert_eq!(mcxt.depth(), 0);
    }

    #[test]
    fn pattern_solutions_are_sound(
        s in shape(),
        spine in Just(vec![0u32, 1, 2, 3]).prop_shuffle(),
        len in 0usize..5,
    ) {
        let size = 4;
        let spine = &spine[..len];
        let env = free_env(size);
        let globals = GlobalEnv::default();
        let mut mcxt = MetaCxt::new();
        let m = mcxt.fresh_meta();

        let lhs = spine
            .iter()
            .fold(Val::meta(m), |v, l| v.app_expl(Val::var(Lvl::new(*l))));
        let rhs = to_term(&s, spine, size, size).eval(&env);

        UnifyCxt::new(&mut mcxt, &globals)
            .unify(Size::zero() + size as usize, lhs.clone(), rhs.clone())
            .unwrap();
        prop_assert!(mcxt.is_solved(m));
        prop_assert!(UnifyCxt::conv(&mut mcxt, &globals)
            .unify(Size::zero() + size as usize, lhs, rhs)
            .is_ok());
    }
}
