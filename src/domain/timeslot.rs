// ==========================================
// 教务排课系统 - 时段网格
// ==========================================
// 职责: 从全校统一配置生成每周固定宽度时段 (1小时粒度)
// 红线: 时段不按实体持久化, 每轮排课从配置重新生成
// ==========================================

use crate::domain::error::{ValidationError, ValidationResult};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

// 位图实现约束: 单日时段数不超过 u32 位宽
pub const MAX_SLOTS_PER_DAY: usize = 32;

// ==========================================
// TimeSlot - 时段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub day_of_week: u8,       // 星期 (0-6, 0=周一)
    pub start_time: NaiveTime, // 开始时刻
    pub end_time: NaiveTime,   // 结束时刻
}

// ==========================================
// SlotGrid - 全校时段网格配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotGrid {
    pub days: Vec<u8>,                   // 教学日 (星期值, 升序, 如 [0,1,2,3,4])
    pub day_start_hour: u32,             // 每日开始整点 (如 9)
    pub day_end_hour: u32,               // 每日结束整点 (不含, 如 17)
    pub lunch_break: Option<(u32, u32)>, // 午休整点区间 [start, end), 该区间不排课
}

impl Default for SlotGrid {
    fn default() -> Self {
        Self {
            days: vec![0, 1, 2, 3, 4],
            day_start_hour: 9,
            day_end_hour: 17,
            lunch_break: Some((12, 13)),
        }
    }
}

impl SlotGrid {
    /// 校验网格配置
    pub fn validate(&self) -> ValidationResult<()> {
        if self.days.is_empty() {
            return Err(ValidationError::InvalidSlotGrid("教学日列表为空".to_string()));
        }
        let mut prev: Option<u8> = None;
        for &d in &self.days {
            if d > 6 {
                return Err(ValidationError::InvalidSlotGrid(format!(
                    "星期值 {} 超出范围 [0, 6]",
                    d
                )));
            }
            if let Some(p) = prev {
                if d <= p {
                    return Err(ValidationError::InvalidSlotGrid(
                        "教学日必须严格升序且不重复".to_string(),
                    ));
                }
            }
            prev = Some(d);
        }
        // 结束整点上限 23: 保证任意时段的结束时刻仍是合法的当日时刻
        if self.day_start_hour >= self.day_end_hour || self.day_end_hour > 23 {
            return Err(ValidationError::InvalidSlotGrid(format!(
                "每日时间窗 [{}, {}) 无效",
                self.day_start_hour, self.day_end_hour
            )));
        }
        if let Some((s, e)) = self.lunch_break {
            if s >= e || s < self.day_start_hour || e > self.day_end_hour {
                return Err(ValidationError::InvalidSlotGrid(format!(
                    "午休区间 [{}, {}) 必须落在每日时间窗内",
                    s, e
                )));
            }
        }
        if self.slot_start_hours().is_empty() {
            return Err(ValidationError::InvalidSlotGrid(
                "网格不含任何可排时段".to_string(),
            ));
        }
        if self.slot_start_hours().len() > MAX_SLOTS_PER_DAY {
            return Err(ValidationError::InvalidSlotGrid(format!(
                "单日时段数超过上限 {}",
                MAX_SLOTS_PER_DAY
            )));
        }
        Ok(())
    }

    /// 生成单日各时段的开始整点 (升序, 跳过午休)
    pub fn slot_start_hours(&self) -> Vec<u32> {
        (self.day_start_hour..self.day_end_hour)
            .filter(|h| match self.lunch_break {
                Some((s, e)) => *h < s || *h >= e,
                None => true,
            })
            .collect()
    }

    /// 单日时段数
    pub fn slots_per_day(&self) -> usize {
        self.slot_start_hours().len()
    }

    /// 全周时段总数
    pub fn total_week_slots(&self) -> usize {
        self.slots_per_day() * self.days.len()
    }

    /// 单日教学小时数 (与 slots_per_day 一致, 1小时粒度)
    pub fn hours_per_day(&self) -> u32 {
        self.slots_per_day() as u32
    }

    /// 判断时段 idx 与 idx+1 在实际时间上是否相邻
    ///
    /// 午休两侧的时段不相邻, 连续性检查依赖此判断
    pub fn slots_adjacent(&self, idx: usize) -> bool {
        let starts = self.slot_start_hours();
        match (starts.get(idx), starts.get(idx + 1)) {
            (Some(a), Some(b)) => b - a == 1,
            _ => false,
        }
    }

    /// 判断 [start_idx, start_idx+len) 是否为实际时间连续的时段块
    pub fn contiguous_run(&self, start_idx: usize, len: usize) -> bool {
        if len == 0 || start_idx + len > self.slots_per_day() {
            return false;
        }
        (start_idx..start_idx + len - 1).all(|i| self.slots_adjacent(i))
    }

    /// 构造指定教学日与时段索引对应的 TimeSlot (时长 hours 小时)
    pub fn slot(&self, day_idx: usize, slot_idx: usize, hours: u8) -> Option<TimeSlot> {
        let day_of_week = *self.days.get(day_idx)?;
        let start_hour = *self.slot_start_hours().get(slot_idx)?;
        let start_time = NaiveTime::from_hms_opt(start_hour, 0, 0)?;
        let end_time = NaiveTime::from_hms_opt(start_hour + hours as u32, 0, 0)?;
        Some(TimeSlot {
            day_of_week,
            start_time,
            end_time,
        })
    }

}
