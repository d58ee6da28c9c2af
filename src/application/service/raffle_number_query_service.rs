use crate::application::ApplicationError;
use crate::domain::model::{NumberCounts, NumberStatus, RaffleId, RaffleNumber, UserId};
use crate::domain::port::{RaffleLookup, RaffleNumberRepository};
use std::sync::Arc;

/// 抽選の番号一覧とステータスごとの集計
#[derive(Debug, Clone)]
pub struct NumberBoard {
    pub numbers: Vec<RaffleNumber>,
    pub counts: NumberCounts,
}

/// 抽選番号クエリサービス
/// 読み取り専用の在庫照会を提供する（状態は変更しない）
pub struct RaffleNumberQueryService {
    number_repository: Arc<dyn RaffleNumberRepository>,
    raffle_lookup: Arc<dyn RaffleLookup>,
}

impl RaffleNumberQueryService {
    /// 新しいクエリサービスを作成
    ///
    /// # Arguments
    /// * `number_repository` - 抽選番号リポジトリ
    /// * `raffle_lookup` - 抽選参照
    pub fn new(
        number_repository: Arc<dyn RaffleNumberRepository>,
        raffle_lookup: Arc<dyn RaffleLookup>,
    ) -> Self {
        Self {
            number_repository,
            raffle_lookup,
        }
    }

    async fn ensure_raffle_exists(&self, raffle_id: RaffleId) -> Result<(), ApplicationError> {
        match self.raffle_lookup.find_raffle(raffle_id).await? {
            Some(_) => Ok(()),
            None => Err(ApplicationError::raffle_not_found(raffle_id)),
        }
    }

    /// 抽選のすべての番号と集計を取得
    /// 番号の昇順で並べて返す
    ///
    /// # Returns
    /// * `Ok(NumberBoard)` - 番号一覧と集計
    /// * `Err(ApplicationError::NotFound)` - 抽選が存在しない
    pub async fn get_all(&self, raffle_id: RaffleId) -> Result<NumberBoard, ApplicationError> {
        self.ensure_raffle_exists(raffle_id).await?;
        let numbers = self.number_repository.find_all(raffle_id).await?;

        let mut counts = NumberCounts::default();
        for number in &numbers {
            counts.record(number.status());
        }

        Ok(NumberBoard { numbers, counts })
    }

    /// 利用可能な番号を取得
    pub async fn get_available(&self, raffle_id: RaffleId) -> Result<Vec<RaffleNumber>, ApplicationError> {
        self.ensure_raffle_exists(raffle_id).await?;
        self.number_repository
            .find_by_status(raffle_id, NumberStatus::Available)
            .await
            .map_err(ApplicationError::from)
    }

    /// 指定された保持者が予約中の番号を取得
    /// 決済開始前に、呼び出し側が主張する番号を検証するために使う
    pub async fn get_held_by(
        &self,
        raffle_id: RaffleId,
        holder: UserId,
    ) -> Result<Vec<RaffleNumber>, ApplicationError> {
        self.ensure_raffle_exists(raffle_id).await?;
        self.number_repository
            .find_held_by(raffle_id, holder)
            .await
            .map_err(ApplicationError::from)
    }

    /// 販売済みの番号のみを取得（保持者・チケットの情報は含まない）
    pub async fn get_sold_numbers(&self, raffle_id: RaffleId) -> Result<Vec<u32>, ApplicationError> {
        self.ensure_raffle_exists(raffle_id).await?;
        let sold = self
            .number_repository
            .find_by_status(raffle_id, NumberStatus::Sold)
            .await?;
        Ok(sold.iter().map(RaffleNumber::number).collect())
    }
}
