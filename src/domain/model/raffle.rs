use crate::domain::model::RaffleId;

/// 抽選の参照情報
/// 抽選管理（外部の協調者）から取得する番号在庫に必要な項目のみを保持する
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaffleInfo {
    pub id: RaffleId,
    pub total_numbers: u32,
    pub enabled: bool,
    pub deleted: bool,
}

impl RaffleInfo {
    pub fn new(id: RaffleId, total_numbers: u32) -> Self {
        Self {
            id,
            total_numbers,
            enabled: true,
            deleted: false,
        }
    }

    /// 新しい予約を受け付けるか
    pub fn accepts_holds(&self) -> bool {
        self.enabled && !self.deleted
    }

    /// 番号が抽選の範囲 `1..=total_numbers` に含まれるか
    pub fn contains(&self, number: u32) -> bool {
        (1..=self.total_numbers).contains(&number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_holds() {
        let mut raffle = RaffleInfo::new(RaffleId::new(), 10);
        assert!(raffle.accepts_holds());

        raffle.enabled = false;
        assert!(!raffle.accepts_holds());

        raffle.enabled = true;
        raffle.deleted = true;
        assert!(!raffle.accepts_holds());
    }

    #[test]
    fn test_contains() {
        let raffle = RaffleInfo::new(RaffleId::new(), 10);
        assert!(!raffle.contains(0));
        assert!(raffle.contains(1));
        assert!(raffle.contains(10));
        assert!(!raffle.contains(11));
    }
}
