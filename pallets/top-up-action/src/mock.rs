use crate as pallet_top_up_action;
use crate::{AssetOps, ProtocolHandlers, SwapAdapter};
use frame::prelude::*;
use pallet_gas_bank::{FungibleNative, NativeOps};
use polkadot_sdk::{
  frame_support::{
    PalletId, construct_runtime, derive_impl, parameter_types,
    traits::{ConstU32, ConstU64, ConstU128},
  },
  frame_system::{self, EnsureRoot},
  sp_runtime::{
    BuildStorage, DispatchResult, TokenError,
    testing::H256,
    traits::{BlakeTwo256, IdentityLookup},
  },
};
use primitives::{AssetKind, HealthFactor, ProtocolId, protocol_id};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

type Block = frame_system::mocking::MockBlock<Test>;
pub type AccountId = u64;
pub type Balance = primitives::Balance;

pub const ALICE: AccountId = 1;
pub const KEEPER: AccountId = 2;
/// Registrant that turns off receipts after registering.
pub const MALLORY: AccountId = 3;
pub const CHARLIE: AccountId = 4;
pub const FEE_SINK: AccountId = 99;
/// Holds collateral supplied through the mock lending handler.
pub const LENDING_POOL: AccountId = 100;
/// Counterparty of every mock swap.
pub const SWAP_POOL: AccountId = 200;

pub const USDC: AssetKind = AssetKind::Local(1);
pub const DAI: AssetKind = AssetKind::Local(2);

pub const LENDING: ProtocolId = protocol_id(b"lending");

pub const INITIAL_BALANCE: Balance = 1_000_000_000_000;
pub const INITIAL_ASSETS: Balance = 1_000_000;
pub const GAS_PER_EXECUTION: u64 = 1_000;
pub const DEFAULT_BASE_FEE: Balance = 10;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Balances: polkadot_sdk::pallet_balances,
    GasBank: pallet_gas_bank,
    TopUp: pallet_top_up_action,
  }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
  type Block = Block;
  type AccountId = AccountId;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Hash = H256;
  type Hashing = BlakeTwo256;
  type AccountData = polkadot_sdk::pallet_balances::AccountData<Balance>;
}

impl polkadot_sdk::pallet_balances::Config for Test {
  type RuntimeEvent = RuntimeEvent;
  type MaxLocks = ConstU32<50>;
  type MaxReserves = ();
  type ReserveIdentifier = [u8; 8];
  type Balance = Balance;
  type DustRemoval = ();
  type ExistentialDeposit = ConstU128<1>;
  type AccountStore = System;
  type WeightInfo = ();
  type FreezeIdentifier = ();
  type MaxFreezes = ();
  type RuntimeHoldReason = RuntimeHoldReason;
  type RuntimeFreezeReason = RuntimeFreezeReason;
  type DoneSlashHandler = ();
}

/// Handler variants available to tests.
#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo, MaxEncodedLen,
)]
pub enum MockHandler {
  /// Takes the whole amount as collateral.
  Lending,
  /// Takes at most the given amount per top-up.
  Capped(Balance),
  /// Claims to have taken one more than offered.
  Greedy,
  /// Takes nothing.
  Inert,
}

thread_local! {
  static ASSET_BALANCES: RefCell<BTreeMap<(AccountId, AssetKind), Balance>> =
    const { RefCell::new(BTreeMap::new()) };
  static REJECTING: RefCell<BTreeSet<AccountId>> = const { RefCell::new(BTreeSet::new()) };
  static HEALTH: RefCell<BTreeMap<Vec<u8>, HealthFactor>> = const { RefCell::new(BTreeMap::new()) };
  static RECOVERS_ON_TOP_UP: RefCell<bool> = const { RefCell::new(false) };
  static BASE_FEE: RefCell<Balance> = const { RefCell::new(DEFAULT_BASE_FEE) };
  /// Output per unit of input, as (numerator, denominator).
  static SWAP_RATE: RefCell<Option<(Balance, Balance)>> = const { RefCell::new(None) };
  /// Portion of the quote the pool fails to deliver.
  static SWAP_SHORTFALL: RefCell<Permill> = const { RefCell::new(Permill::from_parts(0)) };
}

pub fn reset_mock_adapters() {
  ASSET_BALANCES.with(|b| b.borrow_mut().clear());
  REJECTING.with(|r| r.borrow_mut().clear());
  HEALTH.with(|h| h.borrow_mut().clear());
  RECOVERS_ON_TOP_UP.with(|r| *r.borrow_mut() = false);
  BASE_FEE.with(|f| *f.borrow_mut() = DEFAULT_BASE_FEE);
  SWAP_RATE.with(|r| *r.borrow_mut() = None);
  SWAP_SHORTFALL.with(|s| *s.borrow_mut() = Permill::from_parts(0));
}

pub fn set_asset_balance(who: AccountId, asset: AssetKind, amount: Balance) {
  ASSET_BALANCES.with(|b| {
    b.borrow_mut().insert((who, asset), amount);
  });
}

pub fn asset_balance(who: AccountId, asset: AssetKind) -> Balance {
  ASSET_BALANCES.with(|b| b.borrow().get(&(who, asset)).copied().unwrap_or(0))
}

/// Make every incoming transfer to `who` fail, native and asset alike.
pub fn set_rejects_receipts(who: AccountId, rejects: bool) {
  REJECTING.with(|r| {
    let mut set = r.borrow_mut();
    if rejects {
      set.insert(who);
    } else {
      set.remove(&who);
    }
  });
}

fn rejects(who: &AccountId) -> bool {
  REJECTING.with(|r| r.borrow().contains(who))
}

pub fn set_health(account: &[u8], health: HealthFactor) {
  HEALTH.with(|h| {
    h.borrow_mut().insert(account.to_vec(), health);
  });
}

/// When set, a successful top-up lifts the account's health factor to 2.0.
pub fn set_recovers_on_top_up(recovers: bool) {
  RECOVERS_ON_TOP_UP.with(|r| *r.borrow_mut() = recovers);
}

pub fn set_base_fee(fee: Balance) {
  BASE_FEE.with(|f| *f.borrow_mut() = fee);
}

pub fn set_swap_rate(numerator: Balance, denominator: Balance) {
  SWAP_RATE.with(|r| *r.borrow_mut() = Some((numerator, denominator)));
}

pub fn set_swap_shortfall(shortfall: Permill) {
  SWAP_SHORTFALL.with(|s| *s.borrow_mut() = shortfall);
}

/// Native transfers that run the recipient's receive hook after moving funds.
pub struct HookedNative;

impl NativeOps<AccountId, Balance> for HookedNative {
  fn transfer(from: &AccountId, to: &AccountId, amount: Balance) -> DispatchResult {
    FungibleNative::<Balances>::transfer(from, to, amount)?;
    if rejects(to) {
      return Err(DispatchError::Other("transfer failed"));
    }
    Ok(())
  }

  fn balance(who: &AccountId) -> Balance {
    FungibleNative::<Balances>::balance(who)
  }
}

pub struct MockAssetOps;

impl AssetOps<AccountId, AssetKind, Balance> for MockAssetOps {
  fn transfer(
    from: &AccountId,
    to: &AccountId,
    asset: AssetKind,
    amount: Balance,
  ) -> Result<(), DispatchError> {
    if rejects(to) {
      return Err(DispatchError::Other("transfer failed"));
    }
    ASSET_BALANCES.with(|b| {
      let mut map = b.borrow_mut();
      let from_balance = map.get(&(*from, asset)).copied().unwrap_or(0);
      let remaining = from_balance
        .checked_sub(amount)
        .ok_or(DispatchError::Token(TokenError::FundsUnavailable))?;
      map.insert((*from, asset), remaining);
      *map.entry((*to, asset)).or_insert(0) += amount;
      Ok(())
    })
  }

  fn balance(who: &AccountId, asset: AssetKind) -> Balance {
    asset_balance(*who, asset)
  }
}

pub struct MockSwap;

impl SwapAdapter<AccountId, AssetKind, Balance> for MockSwap {
  fn quote(_: AssetKind, _: AssetKind, amount_in: Balance) -> Option<Balance> {
    SWAP_RATE.with(|r| r.borrow().map(|(num, den)| amount_in * num / den))
  }

  fn swap(
    who: &AccountId,
    asset_in: AssetKind,
    asset_out: AssetKind,
    amount_in: Balance,
    min_out: Balance,
  ) -> Result<Balance, DispatchError> {
    let quote = Self::quote(asset_in, asset_out, amount_in)
      .ok_or(DispatchError::Other("no route"))?;
    let out = quote - SWAP_SHORTFALL.with(|s| s.borrow().mul_floor(quote));
    if out < min_out {
      return Err(DispatchError::Other("slippage exceeded"));
    }
    MockAssetOps::transfer(who, &SWAP_POOL, asset_in, amount_in)?;
    MockAssetOps::transfer(&SWAP_POOL, who, asset_out, out)?;
    Ok(out)
  }
}

pub struct MockHandlers;

impl ProtocolHandlers<MockHandler, AccountId, AssetKind, Balance> for MockHandlers {
  fn health_factor(_: &MockHandler, account: &[u8]) -> Result<HealthFactor, DispatchError> {
    Ok(HEALTH.with(|h| h.borrow().get(account).copied().unwrap_or(HealthFactor::from_u32(1))))
  }

  fn apply_top_up(
    kind: &MockHandler,
    source: &AccountId,
    account: &[u8],
    asset: AssetKind,
    amount: Balance,
  ) -> Result<Balance, DispatchError> {
    let taken = match kind {
      MockHandler::Lending => amount,
      MockHandler::Capped(cap) => amount.min(*cap),
      MockHandler::Greedy => return Ok(amount + 1),
      MockHandler::Inert => return Ok(0),
    };
    MockAssetOps::transfer(source, &LENDING_POOL, asset, taken)?;
    if RECOVERS_ON_TOP_UP.with(|r| *r.borrow()) {
      set_health(account, HealthFactor::from_u32(2));
    }
    Ok(taken)
  }
}

pub struct MockBaseFee;

impl Get<Balance> for MockBaseFee {
  fn get() -> Balance {
    BASE_FEE.with(|f| *f.borrow())
  }
}

parameter_types! {
  pub const GasBankPalletId: PalletId = PalletId(*primitives::pallet_ids::GAS_BANK_PALLET_ID);
  pub const TopUpPalletId: PalletId = PalletId(*primitives::pallet_ids::TOP_UP_ACTION_PALLET_ID);
  pub const FeeSink: AccountId = FEE_SINK;
  pub const MaxActionFee: Permill = primitives::params::MAX_ACTION_FEE;
  pub const SwapSlippageTolerance: Permill = primitives::params::SWAP_SLIPPAGE_TOLERANCE;
}

#[cfg(feature = "runtime-benchmarks")]
pub struct MockBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl pallet_gas_bank::BenchmarkHelper<AccountId, Balance> for MockBenchmarkHelper {
  fn fund_account(who: &AccountId, amount: Balance) {
    use polkadot_sdk::frame_support::traits::Currency;
    let _ = Balances::deposit_creating(who, amount);
  }
}

#[cfg(feature = "runtime-benchmarks")]
impl crate::BenchmarkHelper<AccountId, AssetKind, Balance, MockHandler> for MockBenchmarkHelper {
  fn fund_native(who: &AccountId, amount: Balance) {
    use polkadot_sdk::frame_support::traits::Currency;
    let _ = Balances::deposit_creating(who, amount);
  }

  fn mint_asset(asset: AssetKind, who: &AccountId, amount: Balance) {
    set_asset_balance(*who, asset, asset_balance(*who, asset) + amount);
  }

  fn asset() -> AssetKind {
    USDC
  }

  fn handler() -> MockHandler {
    MockHandler::Lending
  }
}

impl pallet_gas_bank::Config for Test {
  type Balance = Balance;
  type NativeOps = HookedNative;
  type PalletId = GasBankPalletId;
  type WeightInfo = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = MockBenchmarkHelper;
}

impl pallet_top_up_action::Config for Test {
  type AssetId = AssetKind;
  type Balance = Balance;
  type AssetOps = MockAssetOps;
  type SwapAdapter = MockSwap;
  type HandlerKind = MockHandler;
  type Handlers = MockHandlers;
  type GasBank = GasBank;
  type AdminOrigin = EnsureRoot<AccountId>;
  type PalletId = TopUpPalletId;
  type FeeSink = FeeSink;
  type BaseFee = MockBaseFee;
  type EstimatedGasUsage = ConstU64<GAS_PER_EXECUTION>;
  type MaxActionFee = MaxActionFee;
  type SwapSlippageTolerance = SwapSlippageTolerance;
  type MaxAccountEncodingLen = ConstU32<{ primitives::params::MAX_ACCOUNT_ENCODING_LEN }>;
  type WeightInfo = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = MockBenchmarkHelper;
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let mut t = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();

  polkadot_sdk::pallet_balances::GenesisConfig::<Test> {
    balances: vec![
      (ALICE, INITIAL_BALANCE),
      (KEEPER, INITIAL_BALANCE),
      (MALLORY, INITIAL_BALANCE),
      (CHARLIE, INITIAL_BALANCE),
    ],
    dev_accounts: None,
  }
  .assimilate_storage(&mut t)
  .unwrap();

  pallet_gas_bank::GenesisConfig::<Test>::default()
    .assimilate_storage(&mut t)
    .unwrap();

  reset_mock_adapters();
  for who in [ALICE, MALLORY, CHARLIE] {
    set_asset_balance(who, USDC, INITIAL_ASSETS);
    set_asset_balance(who, DAI, INITIAL_ASSETS);
  }
  set_asset_balance(SWAP_POOL, USDC, 1_000 * INITIAL_ASSETS);
  set_asset_balance(SWAP_POOL, DAI, 1_000 * INITIAL_ASSETS);

  let mut ext = polkadot_sdk::sp_io::TestExternalities::new(t);
  ext.execute_with(|| System::set_block_number(1));
  ext
}
