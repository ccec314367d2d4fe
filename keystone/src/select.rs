use crate::{Constructor, Container, Diagnostic, Error, Key, Signature};

/// Chooses the constructor of `implementation` to invoke.
///
/// The rules, in order:
///
/// 1. A single zero-argument constructor is used unconditionally.
/// 2. A designated constructor is used without checking its parameters.
/// 3. Otherwise constructors are scanned from the largest arity down and the
///    greediest one whose parameters are all bound wins. Satisfiable
///    constructors sharing the greediest arity are ambiguous.
pub(crate) fn select_constructor(
    implementation: &Key,
    container: &Container,
) -> Result<Constructor, Error> {
    let mut constructors = container.introspector().constructors(implementation)?;
    if constructors.len() == 1 && constructors[0].arity() == 0 {
        return Ok(constructors.remove(0));
    }
    if let Some(pos) = constructors.iter().position(|v| v.is_designated()) {
        return Ok(constructors.swap_remove(pos));
    }
    // Stable sort keeps declaration order among constructors of equal arity.
    constructors.sort_by(|a, b| b.arity().cmp(&a.arity()));
    let type_name = implementation.type_name();
    let mut greediest: Option<usize> = None;
    let mut conflicts: Vec<usize> = Vec::new();
    let mut rejected: Vec<Signature> = Vec::new();
    let mut unresolved: Option<Key> = None;
    for i in 0..constructors.len() {
        let constructor = &constructors[i];
        let mut failed = false;
        for param in constructor.params() {
            if param.is_resolvable(container) {
                continue;
            }
            let signature = constructor.signature();
            if !rejected.contains(&signature) {
                rejected.push(signature);
            }
            unresolved = Some(param.key());
            failed = true;
            break;
        }
        let arity = constructor.arity();
        match greediest {
            Some(g) if constructors[g].arity() != arity => {
                if conflicts.is_empty() {
                    return Ok(constructors.swap_remove(g));
                }
                // Once a tie is pending every smaller constructor joins the
                // conflict set, satisfiable or not.
                insert(&mut conflicts, i);
            }
            Some(g) if !failed => {
                insert(&mut conflicts, g);
                insert(&mut conflicts, i);
            }
            None if !failed => greediest = Some(i),
            _ => {}
        }
    }
    if !conflicts.is_empty() {
        let candidates: Vec<_> = conflicts.iter().map(|i| constructors[*i].signature()).collect();
        container
            .diagnostics()
            .report(&Diagnostic::AmbiguousConstructors {
                type_name,
                candidates: candidates.clone(),
            });
        return Err(Error::AmbiguousConstructors {
            type_name,
            candidates,
        });
    }
    if let Some(g) = greediest {
        return Ok(constructors.swap_remove(g));
    }
    if let Some(unresolved) = unresolved {
        return Err(Error::UnsatisfiableDependencies {
            type_name,
            unresolved,
            rejected,
        });
    }
    Err(Error::NoMatchingConstructor {
        type_name,
        declared: constructors.iter().map(|v| v.signature()).collect(),
    })
}

fn insert(conflicts: &mut Vec<usize>, i: usize) {
    if !conflicts.contains(&i) {
        conflicts.push(i);
    }
}
