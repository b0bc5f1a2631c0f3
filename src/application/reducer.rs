use tokio::time::Instant;
use uuid::Uuid;

use crate::application::tracker::IdentityTable;
use crate::domain::detection::{Detection, RawDetection, ReducePolicy};

/// Decide qué detecciones vuelven al cliente y asigna a cada una una identidad nueva
/// en `table`. Los umbrales de confianza e IoU son cosa del detector y no se
/// vuelven a aplicar aquí.
pub fn reduce(
    raw: Vec<RawDetection>,
    policy: ReducePolicy,
    table: &IdentityTable,
    now: Instant,
) -> Vec<Detection> {
    let kept = match policy {
        ReducePolicy::Passthrough => raw,
        ReducePolicy::Top1 => top1(raw).into_iter().collect(),
    };

    kept.into_iter()
        .map(|det| {
            let id = Uuid::new_v4().to_string();
            table.record(&id, now);
            Detection::from_raw(det, Some(id))
        })
        .collect()
}

/// Gana la mayor confianza; en empate se queda la primera.
fn top1(raw: Vec<RawDetection>) -> Option<RawDetection> {
    raw.into_iter().fold(None, |best, det| match best {
        Some(b) if b.confidence >= det.confidence => Some(b),
        _ => Some(det),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn raw(b: [f32; 4], confidence: f32, class_name: &str) -> RawDetection {
        RawDetection { bbox: b.into(), confidence, class_id: 0, class_name: class_name.into() }
    }

    #[test]
    fn passthrough_keeps_everything_verbatim() {
        let table = IdentityTable::new();
        // IoU 0.9 entre estas dos; aquí no se suprime nada.
        let input = vec![
            raw([0.0, 0.0, 100.0, 100.0], 0.8, "a"),
            raw([0.0, 0.0, 100.0, 90.0], 0.7, "b"),
        ];
        assert!((input[0].bbox.iou(&input[1].bbox) - 0.9).abs() < 1e-6);

        let out = reduce(input.clone(), ReducePolicy::Passthrough, &table, Instant::now());
        assert_eq!(out.len(), 2);
        for (d, r) in out.iter().zip(&input) {
            assert_eq!(d.bbox, r.bbox);
            assert_eq!(d.confidence, r.confidence);
            assert_eq!(d.class_name, r.class_name);
        }
    }

    #[test]
    fn top1_picks_max_and_earliest_on_tie() {
        let table = IdentityTable::new();
        let input = vec![
            raw([0.0; 4], 0.3, "a"),
            raw([0.0; 4], 0.9, "first"),
            raw([0.0; 4], 0.9, "second"),
            raw([0.0; 4], 0.1, "c"),
        ];
        let out = reduce(input, ReducePolicy::Top1, &table, Instant::now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].class_name, "first");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn top1_of_nothing_is_nothing() {
        let table = IdentityTable::new();
        assert!(reduce(vec![], ReducePolicy::Top1, &table, Instant::now()).is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn every_detection_gets_a_new_identity() {
        let table = IdentityTable::new();
        let frame = vec![raw([1.0, 1.0, 5.0, 5.0], 0.5, "a")];
        let first = reduce(frame.clone(), ReducePolicy::Passthrough, &table, Instant::now());
        let second = reduce(frame, ReducePolicy::Passthrough, &table, Instant::now());

        let ids: HashSet<_> = first.iter().chain(&second).filter_map(|d| d.id.clone()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|id| table.contains(id)));
    }
}
