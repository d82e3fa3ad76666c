// src/services/distribution.rs
//
// Round-robin ponderado por contadores. Tudo aqui é puro: o serviço de
// campanhas carrega os dados, chama `pick_consultant` e persiste o incremento.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::models::campaign::{Campaign, EffectiveShare};

/// Consultores que podem receber leads: peso > 0, não excluídos e ativos.
pub fn eligible(campaign: &Campaign, active: &BTreeSet<Uuid>) -> Vec<(Uuid, u32)> {
    campaign
        .distribution
        .iter()
        .filter(|(id, weight)| **weight > 0 && !campaign.excluded.contains(id) && active.contains(id))
        .map(|(id, weight)| (*id, *weight))
        .collect()
}

/// Escolhe quem está mais abaixo da sua meta.
///
/// Minimiza `(counter + 1) / total - weight / sum`, onde `sum` é a soma dos pesos
/// elegíveis (renormalização das exclusões) e `total` os leads já atribuídos aos
/// elegíveis mais o que está chegando. A comparação é feita multiplicando em
/// cruz, em inteiros, para não depender de arredondamento. Empate: maior peso,
/// depois menor id.
pub fn pick_consultant(campaign: &Campaign, active: &BTreeSet<Uuid>) -> Option<Uuid> {
    let candidates = eligible(campaign, active);
    let weight_sum: i128 = candidates.iter().map(|(_, w)| i128::from(*w)).sum();
    let total: i128 = candidates
        .iter()
        .map(|(id, _)| i128::from(campaign.counter(id)))
        .sum::<i128>()
        + 1;

    candidates
        .into_iter()
        .min_by(|(a_id, a_w), (b_id, b_w)| {
            let score = |id: &Uuid, w: u32| {
                (i128::from(campaign.counter(id)) + 1) * weight_sum - i128::from(w) * total
            };
            score(a_id, *a_w)
                .cmp(&score(b_id, *b_w))
                .then_with(|| b_w.cmp(a_w))
                .then_with(|| a_id.cmp(b_id))
        })
        .map(|(id, _)| id)
}

/// Pesos renormalizados sobre os elegíveis; somam 100 quando há alguém elegível.
pub fn effective_shares(campaign: &Campaign, active: &BTreeSet<Uuid>) -> Vec<EffectiveShare> {
    let candidates = eligible(campaign, active);
    let weight_sum: u32 = candidates.iter().map(|(_, w)| *w).sum();

    campaign
        .distribution
        .iter()
        .map(|(id, configured)| {
            let effective_percent = match candidates.iter().find(|(c, _)| c == id) {
                Some((_, w)) if weight_sum > 0 => f64::from(*w) * 100.0 / f64::from(weight_sum),
                _ => 0.0,
            };
            EffectiveShare {
                consultant_id: *id,
                configured: *configured,
                effective_percent,
                assigned: campaign.counter(id),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn campaign(weights: &[(Uuid, u32)]) -> Campaign {
        Campaign {
            id: Uuid::new_v4(),
            name: "Test".into(),
            source: "web".into(),
            active: true,
            distribution: weights.iter().copied().collect(),
            counters: BTreeMap::new(),
            excluded: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    fn ids(n: usize) -> Vec<Uuid> {
        let mut v: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        v.sort();
        v
    }

    fn run(campaign: &mut Campaign, active: &BTreeSet<Uuid>, rounds: usize) {
        for _ in 0..rounds {
            let winner = pick_consultant(campaign, active).unwrap();
            *campaign.counters.entry(winner).or_insert(0) += 1;
        }
    }

    #[test]
    fn sixty_forty_over_ten_assignments() {
        let v = ids(2);
        let mut c = campaign(&[(v[0], 60), (v[1], 40)]);
        let active = v.iter().copied().collect();
        run(&mut c, &active, 10);
        assert_eq!(c.counter(&v[0]), 6);
        assert_eq!(c.counter(&v[1]), 4);
    }

    #[test]
    fn shares_converge_to_targets() {
        let v = ids(3);
        let mut c = campaign(&[(v[0], 50), (v[1], 30), (v[2], 20)]);
        let active: BTreeSet<Uuid> = v.iter().copied().collect();
        for n in [10usize, 100, 1000] {
            c.counters.clear();
            run(&mut c, &active, n);
            for (id, target) in [(v[0], 50.0), (v[1], 30.0), (v[2], 20.0)] {
                let share = c.counter(&id) as f64 * 100.0 / n as f64;
                // erro limitado a um lead sobre n
                assert!((share - target).abs() <= 100.0 / n as f64 + 1e-9, "n={n} share={share}");
            }
        }
    }

    #[test]
    fn excluded_share_is_redistributed_proportionally() {
        let v = ids(3);
        let mut c = campaign(&[(v[0], 50), (v[1], 30), (v[2], 20)]);
        c.excluded.insert(v[0]);
        let active: BTreeSet<Uuid> = v.iter().copied().collect();

        let shares = effective_shares(&c, &active);
        let total: f64 = shares.iter().map(|s| s.effective_percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
        let of = |id: Uuid| shares.iter().find(|s| s.consultant_id == id).unwrap().effective_percent;
        assert_eq!(of(v[0]), 0.0);
        assert!((of(v[1]) - 60.0).abs() < 1e-9);
        assert!((of(v[2]) - 40.0).abs() < 1e-9);

        run(&mut c, &active, 10);
        assert_eq!(c.counter(&v[0]), 0);
        assert_eq!(c.counter(&v[1]), 6);
        assert_eq!(c.counter(&v[2]), 4);
    }

    #[test]
    fn inactive_consultants_are_skipped() {
        let v = ids(2);
        let c = campaign(&[(v[0], 70), (v[1], 30)]);
        let active: BTreeSet<Uuid> = [v[1]].into_iter().collect();
        assert_eq!(pick_consultant(&c, &active), Some(v[1]));
    }

    #[test]
    fn nobody_eligible_yields_none() {
        let v = ids(2);
        let mut c = campaign(&[(v[0], 100), (v[1], 0)]);
        c.excluded.insert(v[0]);
        let active = v.iter().copied().collect();
        assert_eq!(pick_consultant(&c, &active), None);
        assert!(effective_shares(&c, &active).iter().all(|s| s.effective_percent == 0.0));
    }

    #[test]
    fn equal_weights_tie_breaks_on_id() {
        let v = ids(2);
        // 50/50 empata no primeiro lead; o id menor vence
        let c = campaign(&[(v[0], 50), (v[1], 50)]);
        let active = v.iter().copied().collect();
        assert_eq!(pick_consultant(&c, &active), Some(v[0]));
    }
}
