//! Walking the statement tree.
use super::{Def, Stmt};
use crate::Result;

/// Callbacks for the declarations found by [`walk`].
pub trait Visitor {
    fn on_function(&mut self, _def: &Def) -> Result<()> {
        Ok(())
    }

    fn on_type(&mut self, _def: &Def) -> Result<()> {
        Ok(())
    }
}

/// Visit every declaration in `body` in document order, each one before the
/// declarations nested inside it. Stops at the first error.
pub fn walk<V: Visitor + ?Sized>(body: &[Stmt], visitor: &mut V) -> Result<()> {
    for stmt in body {
        match stmt {
            Stmt::Function(def) => {
                visitor.on_function(def)?;
                walk(&def.body, visitor)?;
            }
            Stmt::Class(def) => {
                visitor.on_type(def)?;
                walk(&def.body, visitor)?;
            }
            Stmt::Block { body, .. } => walk(body, visitor)?,
            Stmt::Simple(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::syntax::parse_module;

    #[derive(Default)]
    struct Names(Vec<String>);

    impl Visitor for Names {
        fn on_function(&mut self, def: &Def) -> Result<()> {
            self.0.push(format!("fn {}", def.name));
            Ok(())
        }

        fn on_type(&mut self, def: &Def) -> Result<()> {
            self.0.push(format!("class {}", def.name));
            Ok(())
        }
    }

    #[test]
    fn document_order_outer_first() {
        let src = "\
def a():
    class B:
        def c(self):
            pass
    def d():
        pass
with open(f) as g:
    class E:
        pass
def f():
    pass
";
        let module = parse_module(src).unwrap();
        let mut names = Names::default();
        walk(&module.body, &mut names).unwrap();
        assert_eq!(
            names.0,
            vec!["fn a", "class B", "fn c", "fn d", "class E", "fn f"]
        );
    }

    #[test]
    fn errors_stop_the_walk() {
        struct FailOnSecond(usize);
        impl Visitor for FailOnSecond {
            fn on_function(&mut self, def: &Def) -> Result<()> {
                self.0 += 1;
                snafu::ensure!(
                    self.0 < 2,
                    crate::RenderSnafu {
                        name: def.name.clone(),
                        start: def.span.start,
                        end: def.span.end,
                    }
                );
                Ok(())
            }
        }

        let module = parse_module("def a(): pass\ndef b(): pass\ndef c(): pass\n").unwrap();
        let mut visitor = FailOnSecond(0);
        assert!(walk(&module.body, &mut visitor).is_err());
        assert_eq!(visitor.0, 2);
    }
}
