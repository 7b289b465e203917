// ==========================================
// 教务排课系统 - 可用性索引
// ==========================================
// 职责: 教师/教室/班级的按日时段位图, O(1) 查询与占用/释放
// 红线: 占用与释放严格对称, 回溯撤销后索引必须恢复原状
// ==========================================

use crate::domain::snapshot::ScheduleSnapshot;
use crate::domain::timeslot::SlotGrid;
use std::collections::BTreeMap;

/// 生成 [start, start+len) 时段的位掩码
#[inline]
pub fn block_mask(start_slot: usize, len: usize) -> u32 {
    (((1u64 << len) - 1) << start_slot) as u32
}

// ==========================================
// AvailabilityIndex - 可用性索引
// ==========================================
#[derive(Debug, Clone)]
pub struct AvailabilityIndex {
    days: usize,
    // 教师静态可用位图 (1=该时段教师可用), 由可用时段窗口 ∩ 网格预计算
    teacher_avail: BTreeMap<String, Vec<u32>>,
    // 已占用位图 (1=已被某次分配占用)
    teacher_busy: BTreeMap<String, Vec<u32>>,
    room_busy: BTreeMap<String, Vec<u32>>,
    batch_busy: BTreeMap<String, Vec<u32>>,
}

impl AvailabilityIndex {
    /// 每轮排课从快照与网格构建一次
    pub fn build(snapshot: &ScheduleSnapshot, grid: &SlotGrid) -> Self {
        let days = grid.days.len();
        let starts = grid.slot_start_hours();

        let mut teacher_avail = BTreeMap::new();
        let mut teacher_busy = BTreeMap::new();
        for teacher in &snapshot.teachers {
            let mut masks = vec![0u32; days];
            for (day_idx, &day_of_week) in grid.days.iter().enumerate() {
                for (slot_idx, _) in starts.iter().enumerate() {
                    let Some(slot) = grid.slot(day_idx, slot_idx, 1) else {
                        continue;
                    };
                    if teacher.is_available_at(day_of_week, slot.start_time, slot.end_time) {
                        masks[day_idx] |= block_mask(slot_idx, 1);
                    }
                }
            }
            teacher_avail.insert(teacher.id.clone(), masks);
            teacher_busy.insert(teacher.id.clone(), vec![0u32; days]);
        }

        let room_busy = snapshot
            .rooms
            .iter()
            .map(|r| (r.id.clone(), vec![0u32; days]))
            .collect();
        let batch_busy = snapshot
            .batches
            .iter()
            .map(|b| (b.id.clone(), vec![0u32; days]))
            .collect();

        Self {
            days,
            teacher_avail,
            teacher_busy,
            room_busy,
            batch_busy,
        }
    }

    fn mask_of(map: &BTreeMap<String, Vec<u32>>, id: &str, day_idx: usize) -> u32 {
        map.get(id).and_then(|v| v.get(day_idx)).copied().unwrap_or(0)
    }

    /// 教师在 [start, start+len) 是否静态可用 (可用时段窗口层面)
    pub fn teacher_available(&self, teacher_id: &str, day_idx: usize, start: usize, len: usize) -> bool {
        let mask = block_mask(start, len);
        Self::mask_of(&self.teacher_avail, teacher_id, day_idx) & mask == mask
    }

    /// 教师在 [start, start+len) 是否未被占用
    pub fn teacher_free(&self, teacher_id: &str, day_idx: usize, start: usize, len: usize) -> bool {
        Self::mask_of(&self.teacher_busy, teacher_id, day_idx) & block_mask(start, len) == 0
    }

    /// 教室在 [start, start+len) 是否未被占用
    pub fn room_free(&self, room_id: &str, day_idx: usize, start: usize, len: usize) -> bool {
        Self::mask_of(&self.room_busy, room_id, day_idx) & block_mask(start, len) == 0
    }

    /// 班级在 [start, start+len) 是否未被占用
    pub fn batch_free(&self, batch_id: &str, day_idx: usize, start: usize, len: usize) -> bool {
        Self::mask_of(&self.batch_busy, batch_id, day_idx) & block_mask(start, len) == 0
    }

    /// 教师当日已占用位图 (连续性/间歇检查用)
    pub fn teacher_busy_mask(&self, teacher_id: &str, day_idx: usize) -> u32 {
        Self::mask_of(&self.teacher_busy, teacher_id, day_idx)
    }

    /// 班级当日已占用位图 (空档/相邻性评估用)
    pub fn batch_busy_mask(&self, batch_id: &str, day_idx: usize) -> u32 {
        Self::mask_of(&self.batch_busy, batch_id, day_idx)
    }

    /// 教室当日已占用位图
    pub fn room_busy_mask(&self, room_id: &str, day_idx: usize) -> u32 {
        Self::mask_of(&self.room_busy, room_id, day_idx)
    }

    /// 占用一次分配覆盖的全部时段
    pub fn occupy(
        &mut self,
        teacher_id: &str,
        room_id: &str,
        batch_id: &str,
        day_idx: usize,
        start: usize,
        len: usize,
    ) {
        let mask = block_mask(start, len);
        let days = self.days;
        for (map, id) in [
            (&mut self.teacher_busy, teacher_id),
            (&mut self.room_busy, room_id),
            (&mut self.batch_busy, batch_id),
        ] {
            let entry = map.entry(id.to_string()).or_insert_with(|| vec![0u32; days]);
            entry[day_idx] |= mask;
        }
    }

    /// 释放一次分配 (回溯撤销), 与 occupy 严格对称
    pub fn release(
        &mut self,
        teacher_id: &str,
        room_id: &str,
        batch_id: &str,
        day_idx: usize,
        start: usize,
        len: usize,
    ) {
        let mask = block_mask(start, len);
        for (map, id) in [
            (&mut self.teacher_busy, teacher_id),
            (&mut self.room_busy, room_id),
            (&mut self.batch_busy, batch_id),
        ] {
            if let Some(entry) = map.get_mut(id) {
                entry[day_idx] &= !mask;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{Batch, Department, Program, Room};
    use crate::domain::teacher::{AvailabilityWindow, Teacher};
    use crate::domain::types::RoomType;
    use chrono::NaiveTime;
    use std::collections::BTreeSet;

    fn snapshot_one_of_each() -> ScheduleSnapshot {
        ScheduleSnapshot {
            department: Department {
                id: "D001".to_string(),
                name: "计算机学院".to_string(),
                code: "CS".to_string(),
            },
            programs: vec![Program {
                id: "P001".to_string(),
                department_id: "D001".to_string(),
                name: "软件工程".to_string(),
            }],
            teachers: vec![Teacher {
                id: "T001".to_string(),
                name: "张老师".to_string(),
                department_id: "D001".to_string(),
                max_workload: 16,
                availability: vec![AvailabilityWindow {
                    day_of_week: 0,
                    start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                    is_available: true,
                }],
                qualifications: vec![],
            }],
            courses: vec![],
            rooms: vec![Room {
                id: "R001".to_string(),
                number: "101".to_string(),
                building: "主楼".to_string(),
                capacity: 60,
                room_type: RoomType::Classroom,
                equipment: BTreeSet::new(),
            }],
            batches: vec![Batch {
                id: "B001".to_string(),
                program_id: "P001".to_string(),
                name: "2023级1班".to_string(),
                year: 2023,
                section: "A".to_string(),
                students_count: 40,
            }],
            workload_assignments: vec![],
        }
    }

    #[test]
    fn test_block_mask() {
        assert_eq!(block_mask(0, 1), 0b1);
        assert_eq!(block_mask(2, 3), 0b11100);
    }

    #[test]
    fn test_teacher_static_availability() {
        let snap = snapshot_one_of_each();
        let grid = SlotGrid::default();
        let index = AvailabilityIndex::build(&snap, &grid);

        // 周一 9-12 可用: 时段索引 0,1,2
        assert!(index.teacher_available("T001", 0, 0, 3));
        // 13:00 起的时段不可用
        assert!(!index.teacher_available("T001", 0, 3, 1));
        // 周二整天不可用
        assert!(!index.teacher_available("T001", 1, 0, 1));
    }

    #[test]
    fn test_occupy_release_roundtrip() {
        let snap = snapshot_one_of_each();
        let grid = SlotGrid::default();
        let mut index = AvailabilityIndex::build(&snap, &grid);

        assert!(index.teacher_free("T001", 0, 0, 2));
        index.occupy("T001", "R001", "B001", 0, 0, 2);
        assert!(!index.teacher_free("T001", 0, 0, 1));
        assert!(!index.room_free("R001", 0, 1, 1));
        assert!(!index.batch_free("B001", 0, 0, 2));
        // 相邻未占用时段不受影响
        assert!(index.teacher_free("T001", 0, 2, 1));

        index.release("T001", "R001", "B001", 0, 0, 2);
        assert!(index.teacher_free("T001", 0, 0, 2));
        assert!(index.room_free("R001", 0, 0, 2));
        assert!(index.batch_free("B001", 0, 0, 2));
        assert_eq!(index.teacher_busy_mask("T001", 0), 0);
    }

    #[test]
    fn test_unknown_ids_degrade_safely() {
        let snap = snapshot_one_of_each();
        let grid = SlotGrid::default();
        let index = AvailabilityIndex::build(&snap, &grid);
        // 未知教师视为静态不可用
        assert!(!index.teacher_available("T999", 0, 0, 1));
        // 未知教室无占用记录
        assert!(index.room_free("R999", 0, 0, 1));
    }
}
