//! Ranking and favoring: deciding, among the solutions the solver found,
//! which one (or which set) wins. Modeled on the original compiler's
//! `compareSolutions` — lexicographic `Score` comparison first, then a
//! handful of structural tie-breakers over the solutions' recorded
//! overload choices once scores are equal.

use arrayvec::ArrayVec;

use crate::constraint::{Score, ScoreKind, Solution, SCORE_KIND_COUNT};
use crate::types::Type;

const ALL_SCORE_KINDS: [ScoreKind; SCORE_KIND_COUNT] = [
    ScoreKind::Unavailable,
    ScoreKind::Fix,
    ScoreKind::ForceUnchecked,
    ScoreKind::UserConversion,
    ScoreKind::FunctionConversion,
    ScoreKind::NonDefaultLiteral,
    ScoreKind::CollectionUpcastConversion,
    ScoreKind::ValueToOptional,
    ScoreKind::EmptyExistentialConversion,
    ScoreKind::KeyPathSubscript,
    ScoreKind::ValueToPointerConversion,
    ScoreKind::InOutOptionalityConversion,
];

/// Which score dimensions two scores disagree on, in declaration order —
/// bounded by `SCORE_KIND_COUNT`, so a fixed-capacity `ArrayVec` avoids a
/// heap allocation for what is almost always a one- or two-element diff,
/// used when reporting why a set of tied solutions is ambiguous.
pub fn score_diff_dimensions(a: &Score, b: &Score) -> ArrayVec<ScoreKind, SCORE_KIND_COUNT> {
    ALL_SCORE_KINDS.iter().copied().filter(|k| a.get(*k) != b.get(*k)).collect()
}

/// `Ordering::Less` means `a` is the better solution.
pub fn compare_solutions(a: &Solution, b: &Solution) -> std::cmp::Ordering {
    let by_score = a.score.compare(&b.score);
    if by_score != std::cmp::Ordering::Equal {
        return by_score;
    }
    compare_overload_choices(a, b)
}

/// §4.9's finer comparison once scores tie: totals up, across every
/// locator both solutions chose an overload for, which side wins the one
/// structural tie-breaker expressible purely from what `Solution` records
/// — a non-variadic overload beating a variadic one of otherwise equal
/// standing. "A method on the concrete conforming type beats a protocol
/// extension default" needs declaration-shape knowledge this core
/// doesn't model (`DeclId` is opaque) and is left to the collaborator
/// layer, as spec.md §9 allows.
fn compare_overload_choices(a: &Solution, b: &Solution) -> std::cmp::Ordering {
    let mut a_wins = 0i32;
    let mut b_wins = 0i32;
    for (loc, a_choice) in &a.overload_choices {
        let Some(b_choice) = b.overload_choices.get(loc) else { continue };
        if a_choice.choice == b_choice.choice {
            continue;
        }
        match (has_variadic(&a_choice.opened_type), has_variadic(&b_choice.opened_type)) {
            (false, true) => a_wins += 1,
            (true, false) => b_wins += 1,
            _ => {}
        }
    }
    a_wins.cmp(&b_wins).reverse()
}

fn has_variadic(ty: &Type) -> bool {
    matches!(ty, Type::Function { params, .. } if params.iter().any(|p| p.variadic))
}

/// Whether `candidate` is definitively worse than `reference`.
pub fn is_worse_than(candidate: &Solution, reference: &Solution) -> bool {
    compare_solutions(candidate, reference) == std::cmp::Ordering::Greater
}

/// Reduces a set of solutions found during search to the winning set:
///
/// - Not in `minimize` mode: the single best solution, or every solution
///   tied with it (the caller reports ambiguity when more than one comes
///   back — ranking itself doesn't know what "reported as ambiguous"
///   means to the driver).
/// - In `minimize` mode: every solution no other surviving solution
///   dominates, keeping incomparable solutions side by side rather than
///   forcing a single winner.
pub fn select_winners(mut solutions: Vec<Solution>, minimize: bool) -> Vec<Solution> {
    if solutions.len() <= 1 {
        return solutions;
    }
    solutions.sort_by(compare_solutions);

    if !minimize {
        let mut winners = vec![solutions.remove(0)];
        while !solutions.is_empty() && compare_solutions(&winners[0], &solutions[0]) == std::cmp::Ordering::Equal {
            winners.push(solutions.remove(0));
        }
        return winners;
    }

    let mut winners: Vec<Solution> = Vec::new();
    'candidates: for candidate in solutions {
        for existing in &winners {
            let incomparable = candidate.score.is_incomparable_with(&existing.score);
            if !incomparable && compare_solutions(&candidate, existing) != std::cmp::Ordering::Less {
                continue 'candidates;
            }
        }
        winners.retain(|w| candidate.score.is_incomparable_with(&w.score) || compare_solutions(&candidate, w) == std::cmp::Ordering::Less);
        winners.push(candidate);
    }
    winners
}
