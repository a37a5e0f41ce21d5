//! Gas Bank Pallet
//!
//! Native-currency escrow that reimburses keepers for executing top-up positions.
//!
//! Every position owns one escrow, funded at registration. Keepers are paid out of it
//! with a propagating transfer (only the keeper's own account can make that fail).
//! Money flowing back to the escrow owner is pushed inside an isolated storage layer:
//! when the owner's account rejects the transfer, the amount is kept by the bank as a
//! pull-credit that the owner claims later, and the surrounding call carries on.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod weights;
pub use weights::WeightInfo;


#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub const LOG_TARGET: &str = "runtime::gas-bank";

#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper<AccountId, Balance> {
  fn fund_account(who: &AccountId, amount: Balance);
}

#[frame::pallet]
pub mod pallet {
  use super::{LOG_TARGET, WeightInfo};
  use frame::deps::frame_support::{
    storage::with_storage_layer,
    traits::{fungible, tokens::Preservation},
  };
  use frame::prelude::*;
  use polkadot_sdk::{
    frame_support::PalletId,
    sp_runtime::traits::{AccountIdConversion, Zero},
  };
  use primitives::PositionId;

  /// Native currency movements used by the bank.
  ///
  /// Kept as an adapter so runtimes can route receipts through account-level hooks;
  /// any such hook may reject a transfer.
  pub trait NativeOps<AccountId, Balance> {
    fn transfer(from: &AccountId, to: &AccountId, amount: Balance) -> DispatchResult;

    fn balance(who: &AccountId) -> Balance;
  }

  /// `NativeOps` backed by a `fungible` currency such as pallet-balances.
  pub struct FungibleNative<F>(PhantomData<F>);

  impl<AccountId: Eq, F: fungible::Mutate<AccountId>> NativeOps<AccountId, F::Balance>
    for FungibleNative<F>
  {
    fn transfer(from: &AccountId, to: &AccountId, amount: F::Balance) -> DispatchResult {
      F::transfer(from, to, amount, Preservation::Expendable).map(|_| ())
    }

    fn balance(who: &AccountId) -> F::Balance {
      F::balance(who)
    }
  }

  /// Where a refund ended up.
  #[derive(
    Clone,
    Copy,
    Debug,
    Decode,
    DecodeWithMemTracking,
    Encode,
    Eq,
    PartialEq,
    TypeInfo,
    MaxEncodedLen,
  )]
  pub enum Settlement {
    /// Pushed to the owner's account.
    Delivered,
    /// The owner's account rejected the push; the amount waits in `PullCredits`.
    CreditedForPull,
  }

  /// Escrow operations consumed by the execution engine.
  pub trait GasEscrow<AccountId, Balance> {
    /// Move `amount` from `payer` into the bank as the escrow of position `id`.
    fn open(
      payer: &AccountId,
      owner: &AccountId,
      id: PositionId,
      amount: Balance,
    ) -> DispatchResult;

    fn balance_of(id: PositionId) -> Balance;

    /// Pay up to `owed` to `keeper`, capped at the escrow balance. Returns what was paid.
    fn pay_keeper(
      id: PositionId,
      keeper: &AccountId,
      owed: Balance,
    ) -> Result<Balance, DispatchError>;

    /// Return `amount` to the escrow owner without ever failing on the owner's account.
    fn release(id: PositionId, amount: Balance) -> Result<Settlement, DispatchError>;

    /// Direct transfer of everything left to the owner; removes the escrow.
    fn close(id: PositionId) -> Result<Balance, DispatchError>;
  }

  #[derive(
    Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo, MaxEncodedLen,
  )]
  pub struct EscrowAccount<AccountId, Balance> {
    pub owner: AccountId,
    pub balance: Balance,
    pub deposited: Balance,
    pub paid_out: Balance,
    pub refunded: Balance,
  }

  pub type EscrowAccountOf<T> =
    EscrowAccount<<T as frame_system::Config>::AccountId, <T as Config>::Balance>;

  #[pallet::config]
  pub trait Config: frame_system::Config<RuntimeEvent: From<Event<Self>>> {
    type Balance: Parameter
      + Member
      + AtLeast32BitUnsigned
      + Default
      + Copy
      + MaybeSerializeDeserialize
      + MaxEncodedLen;

    type NativeOps: NativeOps<Self::AccountId, Self::Balance>;

    #[pallet::constant]
    type PalletId: Get<PalletId>;

    type WeightInfo: WeightInfo;

    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: crate::BenchmarkHelper<Self::AccountId, Self::Balance>;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(_);

  #[pallet::storage]
  #[pallet::getter(fn escrows)]
  pub type Escrows<T: Config> =
    StorageMap<_, Blake2_128Concat, PositionId, EscrowAccountOf<T>, OptionQuery>;

  /// Refunds whose push was rejected, claimable by the creditor.
  #[pallet::storage]
  #[pallet::getter(fn pull_credits)]
  pub type PullCredits<T: Config> =
    StorageMap<_, Blake2_128Concat, T::AccountId, T::Balance, ValueQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    EscrowOpened {
      id: PositionId,
      owner: T::AccountId,
      payer: T::AccountId,
      amount: T::Balance,
    },
    EscrowFunded {
      id: PositionId,
      from: T::AccountId,
      amount: T::Balance,
    },
    KeeperPaid {
      id: PositionId,
      keeper: T::AccountId,
      owed: T::Balance,
      paid: T::Balance,
    },
    RefundDelivered {
      id: PositionId,
      to: T::AccountId,
      amount: T::Balance,
    },
    RefundCredited {
      id: PositionId,
      to: T::AccountId,
      amount: T::Balance,
    },
    CreditClaimed {
      who: T::AccountId,
      to: T::AccountId,
      amount: T::Balance,
    },
    EscrowClosed {
      id: PositionId,
      owner: T::AccountId,
      refunded: T::Balance,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// No escrow exists for this position.
    EscrowNotFound,
    /// The position already has an escrow.
    EscrowExists,
    AmountZero,
    /// Nothing to claim.
    NoCredit,
    /// Requested release exceeds the escrow balance.
    InsufficientEscrow,
  }

  #[pallet::hooks]
  impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
    #[cfg(feature = "try-runtime")]
    fn try_state(_n: BlockNumberFor<T>) -> Result<(), polkadot_sdk::sp_runtime::TryRuntimeError> {
      Self::do_try_state()
    }
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Add native currency to an existing escrow. Anyone may fund any position.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::fund())]
    pub fn fund(origin: OriginFor<T>, id: PositionId, amount: T::Balance) -> DispatchResult {
      let who = ensure_signed(origin)?;
      ensure!(!amount.is_zero(), Error::<T>::AmountZero);
      Escrows::<T>::try_mutate(id, |maybe| -> DispatchResult {
        let escrow = maybe.as_mut().ok_or(Error::<T>::EscrowNotFound)?;
        escrow.balance = escrow.balance.saturating_add(amount);
        escrow.deposited = escrow.deposited.saturating_add(amount);
        Ok(())
      })?;
      T::NativeOps::transfer(&who, &Self::account_id(), amount)?;
      Self::deposit_event(Event::EscrowFunded {
        id,
        from: who,
        amount,
      });
      Ok(())
    }

    /// Withdraw every pull-credit owed to the caller, to itself or to `to`.
    ///
    /// Claiming to another account lets owners whose account rejects receipts
    /// recover their refunds.
    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::claim_credit())]
    pub fn claim_credit(origin: OriginFor<T>, to: Option<T::AccountId>) -> DispatchResult {
      let who = ensure_signed(origin)?;
      let amount = PullCredits::<T>::take(&who);
      ensure!(!amount.is_zero(), Error::<T>::NoCredit);
      let dest = to.unwrap_or_else(|| who.clone());
      T::NativeOps::transfer(&Self::account_id(), &dest, amount)?;
      Self::deposit_event(Event::CreditClaimed {
        who,
        to: dest,
        amount,
      });
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    pub fn account_id() -> T::AccountId {
      T::PalletId::get().into_account_truncating()
    }

    /// Push `amount` from the bank to `to`. The transfer runs in its own storage
    /// layer, so a rejecting recipient cannot leave partial writes behind nor
    /// unwind the caller; the amount is credited for pull instead.
    fn push_or_credit(id: PositionId, to: &T::AccountId, amount: T::Balance) -> Settlement {
      if amount.is_zero() {
        return Settlement::Delivered;
      }
      let bank = Self::account_id();
      match with_storage_layer(|| T::NativeOps::transfer(&bank, to, amount)) {
        Ok(()) => {
          Self::deposit_event(Event::RefundDelivered {
            id,
            to: to.clone(),
            amount,
          });
          Settlement::Delivered
        }
        Err(e) => {
          log::warn!(
            target: LOG_TARGET,
            "refund of {:?} from escrow {} rejected by {:?} ({:?}), credited for pull",
            amount,
            id,
            to,
            e,
          );
          PullCredits::<T>::mutate(to, |credit| *credit = credit.saturating_add(amount));
          Self::deposit_event(Event::RefundCredited {
            id,
            to: to.clone(),
            amount,
          });
          Settlement::CreditedForPull
        }
      }
    }

    /// Conservation checks: every escrow accounts for all it received, and the
    /// bank account holds at least what it owes.
    #[cfg(any(feature = "try-runtime", test))]
    pub fn do_try_state() -> Result<(), polkadot_sdk::sp_runtime::TryRuntimeError> {
      let mut owed = T::Balance::zero();
      for (_, escrow) in Escrows::<T>::iter() {
        let accounted = escrow
          .balance
          .saturating_add(escrow.paid_out)
          .saturating_add(escrow.refunded);
        ensure!(
          accounted == escrow.deposited,
          "escrow outflows do not match its deposits"
        );
        owed = owed.saturating_add(escrow.balance);
      }
      for (_, credit) in PullCredits::<T>::iter() {
        owed = owed.saturating_add(credit);
      }
      ensure!(
        T::NativeOps::balance(&Self::account_id()) >= owed,
        "gas bank holds less than it owes"
      );
      Ok(())
    }
  }

  impl<T: Config> GasEscrow<T::AccountId, T::Balance> for Pallet<T> {
    fn open(
      payer: &T::AccountId,
      owner: &T::AccountId,
      id: PositionId,
      amount: T::Balance,
    ) -> DispatchResult {
      ensure!(!Escrows::<T>::contains_key(id), Error::<T>::EscrowExists);
      if !amount.is_zero() {
        T::NativeOps::transfer(payer, &Self::account_id(), amount)?;
      }
      Escrows::<T>::insert(
        id,
        EscrowAccount {
          owner: owner.clone(),
          balance: amount,
          deposited: amount,
          paid_out: Zero::zero(),
          refunded: Zero::zero(),
        },
      );
      log::debug!(target: LOG_TARGET, "escrow {} opened with {:?}", id, amount);
      Self::deposit_event(Event::EscrowOpened {
        id,
        owner: owner.clone(),
        payer: payer.clone(),
        amount,
      });
      Ok(())
    }

    fn balance_of(id: PositionId) -> T::Balance {
      Escrows::<T>::get(id)
        .map(|escrow| escrow.balance)
        .unwrap_or_default()
    }

    fn pay_keeper(
      id: PositionId,
      keeper: &T::AccountId,
      owed: T::Balance,
    ) -> Result<T::Balance, DispatchError> {
      let paid = Escrows::<T>::try_mutate(id, |maybe| -> Result<T::Balance, DispatchError> {
        let escrow = maybe.as_mut().ok_or(Error::<T>::EscrowNotFound)?;
        let paid = owed.min(escrow.balance);
        escrow.balance = escrow.balance.saturating_sub(paid);
        escrow.paid_out = escrow.paid_out.saturating_add(paid);
        Ok(paid)
      })?;
      if !paid.is_zero() {
        T::NativeOps::transfer(&Self::account_id(), keeper, paid)?;
      }
      log::debug!(
        target: LOG_TARGET,
        "escrow {} paid keeper {:?}: {:?} of {:?} owed",
        id,
        keeper,
        paid,
        owed,
      );
      Self::deposit_event(Event::KeeperPaid {
        id,
        keeper: keeper.clone(),
        owed,
        paid,
      });
      Ok(paid)
    }

    fn release(id: PositionId, amount: T::Balance) -> Result<Settlement, DispatchError> {
      let owner = Escrows::<T>::try_mutate(id, |maybe| -> Result<T::AccountId, DispatchError> {
        let escrow = maybe.as_mut().ok_or(Error::<T>::EscrowNotFound)?;
        ensure!(amount <= escrow.balance, Error::<T>::InsufficientEscrow);
        escrow.balance = escrow.balance.saturating_sub(amount);
        escrow.refunded = escrow.refunded.saturating_add(amount);
        Ok(escrow.owner.clone())
      })?;
      Ok(Self::push_or_credit(id, &owner, amount))
    }

    fn close(id: PositionId) -> Result<T::Balance, DispatchError> {
      let escrow = Escrows::<T>::take(id).ok_or(Error::<T>::EscrowNotFound)?;
      if !escrow.balance.is_zero() {
        T::NativeOps::transfer(&Self::account_id(), &escrow.owner, escrow.balance)?;
      }
      Self::deposit_event(Event::EscrowClosed {
        id,
        owner: escrow.owner,
        refunded: escrow.balance,
      });
      Ok(escrow.balance)
    }
  }

  /// Keeps the bank account alive at zero balance.
  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    #[serde(skip)]
    pub _marker: core::marker::PhantomData<T>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      frame_system::Pallet::<T>::inc_providers(&Pallet::<T>::account_id());
    }
  }
}
